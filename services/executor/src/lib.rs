#![forbid(unsafe_code)]

pub mod auth;
pub mod clickhouse;
pub mod config;
pub mod container;
pub mod demux;
pub mod domain;
pub mod error;
pub mod grpc;
pub mod service;
