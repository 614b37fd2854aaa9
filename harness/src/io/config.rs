//! Harness configuration loaded from an optional TOML file.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Path to the scanner binary, relative to the directory tests run from.
pub const DEFAULT_BINARY_PATH: &str = "../bin/chopchop";

/// Harness configuration (TOML).
///
/// Missing fields take their defaults, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Scanner executable invoked by every run.
    pub binary_path: PathBuf,

    /// Echo scanner stdout to the console while it runs.
    pub echo_output: bool,

    /// Interface the mock server binds on.
    pub bind_host: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from(DEFAULT_BINARY_PATH),
            echo_output: true,
            bind_host: "0.0.0.0".to_string(),
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.binary_path.as_os_str().is_empty() {
            return Err(anyhow!("binary_path must not be empty"));
        }
        self.bind_ip()?;
        Ok(())
    }

    pub fn bind_ip(&self) -> Result<IpAddr> {
        self.bind_host
            .parse()
            .with_context(|| format!("bind_host {:?} is not an IP address", self.bind_host))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, HarnessConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("harness.toml");
        fs::write(&path, "binary_path = \"/opt/scanner\"\necho_output = false\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.binary_path, PathBuf::from("/opt/scanner"));
        assert!(!cfg.echo_output);
        assert_eq!(cfg.bind_host, "0.0.0.0");
    }

    #[test]
    fn rejects_bad_bind_host() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("harness.toml");
        fs::write(&path, "bind_host = \"localhost\"\n").expect("write");

        let err = load_config(&path).expect_err("invalid host");
        assert!(format!("{err:#}").contains("bind_host"));
    }

    #[test]
    fn bind_ip_parses_default_host() {
        let ip = HarnessConfig::default().bind_ip().expect("default host");
        assert!(ip.is_unspecified());
    }

    #[test]
    fn rejects_empty_binary_path() {
        let cfg = HarnessConfig {
            binary_path: PathBuf::new(),
            ..HarnessConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("harness.toml");
        fs::write(&path, "echo_output = [").expect("write");

        assert!(load_config(&path).is_err());
    }
}
