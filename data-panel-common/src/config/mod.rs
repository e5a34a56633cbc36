pub mod config;

pub use self::config::{PropsConfig, RewriteConfig};
