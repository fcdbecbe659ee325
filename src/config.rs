//! Optional static credential configuration for the `pop3` binary.
//!
//! The engine's credential check is a pluggable pure predicate (§6); this
//! is one concrete way to supply it, read once at startup from a TOML
//! file. With no config path given, or the file absent, the predicate
//! accepts anything — the same behavior as building the original with its
//! credential check compiled out.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub credentials: Option<Credentials>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        Ok(config)
    }

    /// Build the credential predicate this config describes. No
    /// `[credentials]` table means "accept anything", matching a build
    /// with the credential check disabled.
    pub fn into_check(self) -> Box<dyn Fn(&str, &[u8]) -> bool> {
        match self.credentials {
            Some(Credentials { username, password }) => {
                Box::new(move |user: &str, pass: &[u8]| {
                    user == username && pass == password.as_bytes()
                })
            }
            None => Box::new(|_, _| true),
        }
    }
}
