//! Runtime configuration.
//!
//! Read from a TOML file; every table and key is optional and falls back to the defaults below.
//!
//! ```toml
//! [endpoint]
//! host = "localhost"
//! port = 52463
//! response_timeout_ms = 30000
//!
//! [output]
//! pipe_file = "testPipeDelimitedOutputFile.txt"
//! xml_file = "testXmlOutputFile.xml"
//!
//! [message.patient]
//! identifiers = ["378785433211"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::Deserialize;

use crate::builder::AdtA01Params;
use crate::error::{Hl7Error, Result};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "HL7_ADT_CONFIG";
/// File looked up in the working directory when the variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "hl7-adt.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub output: OutputConfig,
    pub listener: ListenerConfig,
    /// Trigger event requested from the factory.
    pub trigger_event: String,
    pub message: AdtA01Params,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            output: OutputConfig::default(),
            listener: ListenerConfig::default(),
            trigger_event: "A01".to_string(),
            message: AdtA01Params::default(),
        }
    }
}

/// Remote MLLP endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 52463,
            connect_timeout_ms: 10_000,
            response_timeout_ms: 30_000,
        }
    }
}

impl EndpointConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Hl7Error::Config("endpoint.host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Hl7Error::Config("endpoint.port must be between 1 and 65535".to_string()));
        }
        if self.connect_timeout_ms == 0 || self.response_timeout_ms == 0 {
            return Err(Hl7Error::Config("endpoint timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub pipe_file: PathBuf,
    pub xml_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pipe_file: PathBuf::from("testPipeDelimitedOutputFile.txt"),
            xml_file: PathBuf::from("testXmlOutputFile.xml"),
        }
    }
}

/// Bind address of the bundled acknowledgment listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub bind: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:52463".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| Hl7Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Hl7Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Loads the file named by `HL7_ADT_CONFIG`, else `hl7-adt.toml` when present, else defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            info!("Loading configuration from {}", path);
            return Self::from_file(Path::new(&path));
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            info!("Loading configuration from {}", default_path.display());
            return Self::from_file(default_path);
        }

        info!("No configuration file found, using built-in defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint.validate()?;
        if self.trigger_event.trim().is_empty() {
            return Err(Hl7Error::Config("trigger_event must not be empty".to_string()));
        }
        Ok(())
    }
}
