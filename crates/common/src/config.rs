use std::{env, fs, path::Path};

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Reads a YAML config file, expands `$VAR` / `${VAR}` references against
/// the process environment the way the original services did with Go's
/// `os.ExpandEnv`, and deserializes the result.
///
/// Unset variables expand to an empty string, matching `os.ExpandEnv`.
pub fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigLoadError> {
    let raw = fs::read_to_string(path)?;
    let expanded = expand_env(&raw);
    let value = serde_yaml::from_str(&expanded)?;
    Ok(value)
}

/// Expands `$NAME` and `${NAME}` occurrences in `input` using the current
/// process environment. `$$` escapes to a literal `$`.
pub fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('{') => {
                chars.next();
                let mut name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    name.push(c);
                }
                out.push_str(&env::var(&name).unwrap_or_default());
            }
            Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
                let mut name = String::new();
                while let Some(c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || *c == '_' {
                        name.push(*c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(&env::var(&name).unwrap_or_default());
            }
            _ => out.push('$'),
        }
    }

    out
}
