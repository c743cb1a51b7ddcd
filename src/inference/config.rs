//! Inference configuration

use crate::config::{env_lookup, required};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the serving process finds its model artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLocation {
    /// Storage container
    pub container: String,

    /// Object key inside the container
    pub key: String,
}

impl ModelLocation {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }

    /// Read `MODEL_BUCKET` and `MODEL_KEY` from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            container: required(&lookup, "MODEL_BUCKET")?,
            key: required(&lookup, "MODEL_KEY")?,
        })
    }
}

impl fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}
