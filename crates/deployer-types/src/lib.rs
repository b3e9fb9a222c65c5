//! Shared types for haproxy-deployer
//!
//! This crate contains the deployment options record, the target the
//! deployment is created in, and the optional TOML config file format.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Image deployed when nothing overrides it
pub const DEFAULT_IMAGE: &str = "repo.emcrubicon.com/olifant-haproxy:1.0.0";

/// Deployment name used when nothing overrides it
pub const DEFAULT_NAME: &str = "haproxy-test";

/// Container port exposed when nothing overrides it
pub const DEFAULT_PORT: u16 = 5000;

/// Namespace the deployment is created in by default
pub const DEFAULT_NAMESPACE: &str = "aslan";

// ============================================================================
// Deployment Options
// ============================================================================

/// Options the Deployment descriptor is built from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentOptions {
    /// Container image reference
    pub image: String,
    /// Deployment, pod template and container name
    pub name: String,
    /// TCP port exposed by the container
    pub port: u16,
}

impl DeploymentOptions {
    pub fn new(image: impl Into<String>, name: impl Into<String>, port: u16) -> Self {
        Self {
            image: image.into(),
            name: name.into(),
            port,
        }
    }

    /// The HAProxy deployment this tool was written for
    pub fn haproxy() -> Self {
        Self::new(DEFAULT_IMAGE, DEFAULT_NAME, DEFAULT_PORT)
    }

    /// Check that image and name are set and the port is usable
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.image.trim().is_empty() {
            return Err(OptionsError::EmptyImage);
        }
        if self.name.trim().is_empty() {
            return Err(OptionsError::EmptyName);
        }
        if self.image.trim() != self.image {
            return Err(OptionsError::Untrimmed("container image"));
        }
        if self.name.trim() != self.name {
            return Err(OptionsError::Untrimmed("deployment name"));
        }
        if self.port == 0 {
            return Err(OptionsError::InvalidPort(self.port));
        }
        Ok(())
    }

    /// Apply the overrides present in a config file section
    pub fn merge(&mut self, overrides: &DeploymentSection) {
        if let Some(image) = &overrides.image {
            self.image = image.clone();
        }
        if let Some(name) = &overrides.name {
            self.name = name.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
    }
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        Self::haproxy()
    }
}

/// Invalid deployment options
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("container image must not be empty")]
    EmptyImage,
    #[error("deployment name must not be empty")]
    EmptyName,
    #[error("container port {0} is out of range 1-65535")]
    InvalidPort(u16),
    #[error("{0} must not have leading or trailing whitespace")]
    Untrimmed(&'static str),
}

// ============================================================================
// Deploy Target
// ============================================================================

/// Where the deployment is created
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployTarget {
    pub namespace: String,
}

impl DeployTarget {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Check that the namespace is set
    pub fn validate(&self) -> Result<(), TargetError> {
        if self.namespace.trim().is_empty() {
            return Err(TargetError::EmptyNamespace);
        }
        if self.namespace.trim() != self.namespace {
            return Err(TargetError::UntrimmedNamespace(self.namespace.clone()));
        }
        Ok(())
    }

    /// Endpoint of the etcd cluster the container coordinates through
    pub fn etcd_endpoint(&self) -> String {
        format!("http://etcd-cluster.{}:2379", self.namespace)
    }
}

impl Default for DeployTarget {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// Invalid deploy target
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("namespace must not be empty")]
    EmptyNamespace,
    #[error("namespace {0:?} must not have leading or trailing whitespace")]
    UntrimmedNamespace(String),
}

// ============================================================================
// Config File
// ============================================================================

/// Optional TOML config file
///
/// ```toml
/// namespace = "aslan"
///
/// [deployment]
/// image = "repo.emcrubicon.com/olifant-haproxy:1.0.0"
/// name = "haproxy-test"
/// port = 5000
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub namespace: Option<String>,
    #[serde(default)]
    pub deployment: DeploymentSection,
}

/// `[deployment]` table of the config file
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeploymentSection {
    pub image: Option<String>,
    pub name: Option<String>,
    pub port: Option<u16>,
}

impl FileConfig {
    /// Parse a config file from a string
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load and parse a config file from disk
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Config file could not be loaded
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_haproxy_defaults() {
        let options = DeploymentOptions::default();
        assert_eq!(options.image, "repo.emcrubicon.com/olifant-haproxy:1.0.0");
        assert_eq!(options.name, "haproxy-test");
        assert_eq!(options.port, 5000);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let options = DeploymentOptions::new("", "haproxy", 80);
        assert_eq!(options.validate(), Err(OptionsError::EmptyImage));

        let options = DeploymentOptions::new("haproxy:2.9", "  ", 80);
        assert_eq!(options.validate(), Err(OptionsError::EmptyName));

        let options = DeploymentOptions::new("haproxy:2.9", "haproxy", 0);
        assert_eq!(options.validate(), Err(OptionsError::InvalidPort(0)));
    }

    #[test]
    fn test_validate_rejects_surrounding_whitespace() {
        let options = DeploymentOptions::new("haproxy:2.9", " haproxy", 80);
        assert_eq!(
            options.validate(),
            Err(OptionsError::Untrimmed("deployment name"))
        );

        let options = DeploymentOptions::new("haproxy:2.9\n", "haproxy", 80);
        assert_eq!(
            options.validate(),
            Err(OptionsError::Untrimmed("container image"))
        );
    }

    #[test]
    fn test_validate_target() {
        assert!(DeployTarget::default().validate().is_ok());
        assert_eq!(
            DeployTarget::new("").validate(),
            Err(TargetError::EmptyNamespace)
        );
        assert_eq!(
            DeployTarget::new("   ").validate(),
            Err(TargetError::EmptyNamespace)
        );
        assert_eq!(
            DeployTarget::new("edge ").validate(),
            Err(TargetError::UntrimmedNamespace("edge ".to_string()))
        );
    }

    #[test]
    fn test_etcd_endpoint_follows_namespace() {
        assert_eq!(
            DeployTarget::default().etcd_endpoint(),
            "http://etcd-cluster.aslan:2379"
        );
        assert_eq!(
            DeployTarget::new("edge").etcd_endpoint(),
            "http://etcd-cluster.edge:2379"
        );
    }

    #[test]
    fn test_parse_config_and_merge() {
        let config = FileConfig::parse(
            r#"
            namespace = "edge"

            [deployment]
            image = "haproxy:2.9"
            port = 8443
            "#,
        )
        .unwrap();
        assert_eq!(config.namespace.as_deref(), Some("edge"));

        let mut options = DeploymentOptions::default();
        options.merge(&config.deployment);
        assert_eq!(options.image, "haproxy:2.9");
        assert_eq!(options.name, "haproxy-test");
        assert_eq!(options.port, 8443);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = FileConfig::parse("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(FileConfig::parse("replicas = 3").is_err());
        assert!(FileConfig::parse("[deployment]\nport = 70000").is_err());
    }

    #[test]
    fn test_load_config_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[deployment]\nname = \"haproxy-edge\"").unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.deployment.name.as_deref(), Some("haproxy-edge"));
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_load_missing_config() {
        let err = FileConfig::load(Path::new("/nonexistent/haproxy-deployer.toml")).unwrap_err();
        assert!(matches!(err, ConfigFileError::Read { .. }));
    }
}
