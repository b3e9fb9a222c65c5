//! Kubernetes client for haproxy-deployer
//!
//! This crate builds an authenticated client from a kubeconfig file and
//! creates the HAProxy Deployment through it.

mod api;
mod client;
mod descriptor;
mod ensure;

pub use api::{DeploymentApi, KubeDeploymentApi, is_not_found};
pub use client::{ClientError, ClusterClient};
pub use descriptor::{CONFD_ARG, CPU_LIMIT, ETCD_HOST_ENV, MEMORY_LIMIT, build_deployment};
pub use ensure::{EnsureError, EnsureMode, EnsureOutcome, ensure_deployment};

// Re-export types that are used in our public API
pub use deployer_types::{DeployTarget, DeploymentOptions};
pub use k8s_openapi::api::apps::v1::Deployment;
