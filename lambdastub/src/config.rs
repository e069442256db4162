//! Configuration management

use crate::builtins::{Builtin, FunctionEntry};
use lambdastub_invoke::InvokeConfig;
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub invoke: InvokeConfig,

    #[serde(default = "default_functions")]
    pub functions: Vec<FunctionEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            invoke: InvokeConfig::default(),
            functions: default_functions(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

fn default_port() -> u16 {
    4574
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_functions() -> Vec<FunctionEntry> {
    vec![
        FunctionEntry::new("HelloWorldFunction", Builtin::Hello),
        FunctionEntry::new("Echo", Builtin::Echo),
    ]
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// `path` defaults to `lambdastub` (any extension the config crate knows).
    /// Environment overrides use `LAMBDASTUB__SECTION__KEY`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name("lambdastub").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("LAMBDASTUB").separator("__"))
            .build()?;

        config.try_deserialize::<Config>()
    }
}
