use std::fs::File;
use std::io::Read;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use serde::Deserialize;
use serde::Serialize;

use crate::common::Result;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RewriteConfig {
    props: PropsConfig,
}

impl RewriteConfig {
    pub fn from_str(config_str: &str) -> Result<Self> {
        Ok(toml::from_str(config_str)?)
    }

    pub fn from_file(config_file: &str) -> Result<Self> {
        let mut file = File::open(config_file)?;
        let mut config_str = String::new();
        file.read_to_string(&mut config_str)?;
        Self::from_str(&*config_str)
    }

    pub fn props(&self) -> &PropsConfig {
        &self.props
    }
}

impl RewriteConfig {
    pub fn query_with_cipher_column() -> bool {
        RewriteConfig::current().props.query_with_cipher_column
    }

    pub fn sql_show() -> bool {
        RewriteConfig::current().props.sql_show
    }
}

/// Properties of one data panel, `[props]` in the config file.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default, rename_all = "kebab-case")]
pub struct PropsConfig {
    /// Read the cipher column even when a plain column exists.
    query_with_cipher_column: bool,
    /// Log the final edits of every rewrite at info level.
    sql_show: bool,
}

impl PropsConfig {
    pub fn new(query_with_cipher_column: bool, sql_show: bool) -> Self {
        PropsConfig {
            query_with_cipher_column,
            sql_show,
        }
    }

    pub fn query_with_cipher_column(&self) -> bool {
        self.query_with_cipher_column
    }

    pub fn sql_show(&self) -> bool {
        self.sql_show
    }
}

impl Default for PropsConfig {
    fn default() -> Self {
        PropsConfig {
            query_with_cipher_column: true,
            sql_show: false,
        }
    }
}

impl RewriteConfig {
    pub fn current() -> Arc<RewriteConfig> {
        match REWRITE_CONFIG_CACHE.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn make_current(self) {
        let config = Arc::new(self);
        match REWRITE_CONFIG_CACHE.write() {
            Ok(mut current) => *current = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
        log::debug!("rewrite config swapped: {:?}", RewriteConfig::current());
    }
}

lazy_static! {
    static ref REWRITE_CONFIG_CACHE: RwLock<Arc<RewriteConfig>> = RwLock::new(Default::default());
}
