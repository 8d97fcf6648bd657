use crate::*;

use serde::{Deserialize, Serialize};

/// The available oracle backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Backend {
    Z3,
    Bundled,
}

impl Backend {
    pub fn all() -> Vec<Self> {
        vec![Self::Z3, Self::Bundled]
    }

    pub fn oracle(
        &self,
        config: &search::Config,
    ) -> Result<Box<dyn oracle::Oracle>, String> {
        match self {
            Backend::Z3 => z3_oracle(config),
            Backend::Bundled => {
                Ok(Box::new(bundled::Bundled::new(config.bundled())))
            }
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(target_arch = "wasm32") {
            Backend::Bundled
        } else {
            Backend::Z3
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn z3_oracle(
    config: &search::Config,
) -> Result<Box<dyn oracle::Oracle>, String> {
    Ok(Box::new(smt::Z3::new(config.timeout_ms)))
}

#[cfg(target_arch = "wasm32")]
fn z3_oracle(
    _config: &search::Config,
) -> Result<Box<dyn oracle::Oracle>, String> {
    Err("the Z3 backend is not available in WebAssembly builds".to_owned())
}

impl std::str::FromStr for Backend {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(&format!("\"{}\"", s))
    }
}
