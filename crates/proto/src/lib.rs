pub mod sso {
    pub mod v1 {
        tonic::include_proto!("sso.v1");
    }
}

pub mod xcutr {
    pub mod v1 {
        tonic::include_proto!("xcutr.v1");
    }
}
