//! Cluster client construction from a kubeconfig file

use std::path::{Path, PathBuf};

use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use thiserror::Error;
use tracing::debug;

/// Errors raised while turning a kubeconfig into a client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to read kubeconfig {}", path.display())]
    ReadKubeconfig {
        path: PathBuf,
        #[source]
        source: KubeconfigError,
    },
    #[error("failed to create config for context {}", context.as_deref().unwrap_or("<unset>"))]
    InvalidConfig {
        context: Option<String>,
        #[source]
        source: KubeconfigError,
    },
    #[error("failed to create client for context {}", context.as_deref().unwrap_or("<unset>"))]
    BuildClient {
        context: Option<String>,
        #[source]
        source: kube::Error,
    },
}

/// A loaded kubeconfig, ready to produce a client for its current context
pub struct ClusterClient {
    kubeconfig: Kubeconfig,
    path: PathBuf,
}

impl ClusterClient {
    /// Load and parse the kubeconfig at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref().to_path_buf();
        let kubeconfig =
            Kubeconfig::read_from(&path).map_err(|source| ClientError::ReadKubeconfig {
                path: path.clone(),
                source,
            })?;

        debug!(
            path = %path.display(),
            context = ?kubeconfig.current_context,
            "loaded kubeconfig"
        );

        Ok(Self { kubeconfig, path })
    }

    /// Load the kubeconfig at `path` and connect to its current context
    pub async fn from_kubeconfig(path: impl AsRef<Path>) -> Result<kube::Client, ClientError> {
        Self::load(path)?.connect().await
    }

    /// Path the kubeconfig was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the context the client will be bound to
    pub fn current_context(&self) -> Option<&str> {
        self.kubeconfig.current_context.as_deref()
    }

    /// Namespace recorded on the current context, if any
    pub fn namespace_hint(&self) -> Option<&str> {
        let current = self.current_context()?;
        self.kubeconfig
            .contexts
            .iter()
            .find(|ctx| ctx.name == current)
            .and_then(|ctx| ctx.context.as_ref())
            .and_then(|ctx| ctx.namespace.as_deref())
    }

    /// Create a kube::Client for the current context
    pub async fn connect(&self) -> Result<kube::Client, ClientError> {
        let context = self.current_context().map(str::to_string);

        // Default options resolve the kubeconfig's current-context
        let config = kube::Config::from_custom_kubeconfig(
            self.kubeconfig.clone(),
            &KubeConfigOptions::default(),
        )
        .await
        .map_err(|source| ClientError::InvalidConfig {
            context: context.clone(),
            source,
        })?;

        debug!(cluster_url = %config.cluster_url, "resolved cluster config");

        kube::Client::try_from(config)
            .map_err(|source| ClientError::BuildClient { context, source })
    }
}
