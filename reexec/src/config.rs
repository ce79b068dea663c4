use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error;

use crate::exec::{self, EnvList};

/// Environment given to the target when no configuration file is used
pub const DEFAULT_ENVIRONMENT: [&str; 2] = ["MYVAR1=value1", "MYVAR2=value2"];

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// reexec configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// KEY=VALUE entries making up the whole environment of the target
    pub environment: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(p: P) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(&fs::read_to_string(p)?)?)
    }

    pub fn environment<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environment = entries.into_iter().map(|e| e.into()).collect();
        self
    }

    #[inline]
    pub fn env_list(&self) -> Result<EnvList, exec::Error> {
        EnvList::new(&self.environment)
    }
}
