//! Create the HAProxy Deployment in the target namespace

use k8s_openapi::api::apps::v1::Deployment;
use thiserror::Error;
use tracing::{debug, info, warn};

use deployer_types::{DeployTarget, DeploymentOptions};

use crate::api::{DeploymentApi, is_not_found};
use crate::descriptor::build_deployment;

/// How an existing or missing deployment is handled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnsureMode {
    /// Create once; if the server answers 404, issue the same create again.
    ///
    /// Despite looking like update-or-create, nothing is ever updated: an
    /// existing deployment makes the create fail with 409.
    #[default]
    RetryCreate,
    /// Look the deployment up, then create it or replace it in place
    Upsert,
}

/// What the cluster ended up with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    CreatedOnRetry,
    Replaced,
}

/// Deployment could not be ensured
#[derive(Debug, Error)]
pub enum EnsureError {
    #[error("could not create deployment {name}: {source}")]
    Create {
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("could not look up deployment {name}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("could not replace deployment {name}: {source}")]
    Replace {
        name: String,
        #[source]
        source: kube::Error,
    },
}

/// Build the deployment from `options` and submit it according to `mode`
pub async fn ensure_deployment(
    api: &dyn DeploymentApi,
    options: &DeploymentOptions,
    target: &DeployTarget,
    mode: EnsureMode,
) -> Result<EnsureOutcome, EnsureError> {
    let deployment = build_deployment(options, target);
    debug!(name = %options.name, namespace = %target.namespace, ?mode, "ensuring deployment");

    match mode {
        EnsureMode::RetryCreate => retry_create(api, &deployment, options, target).await,
        EnsureMode::Upsert => upsert(api, deployment, options, target).await,
    }
}

async fn retry_create(
    api: &dyn DeploymentApi,
    deployment: &Deployment,
    options: &DeploymentOptions,
    target: &DeployTarget,
) -> Result<EnsureOutcome, EnsureError> {
    let name = &options.name;

    match api.create(deployment).await {
        Ok(_) => {
            info!(
                "{} deployment is done in namespace {}",
                name, target.namespace
            );
            Ok(EnsureOutcome::Created)
        }
        Err(source) if !is_not_found(&source) => Err(EnsureError::Create {
            name: name.clone(),
            source,
        }),
        Err(error) => {
            // Same request again, there is no update path here
            warn!(%error, "create returned not found, retrying the same create");
            api.create(deployment)
                .await
                .map_err(|source| EnsureError::Create {
                    name: name.clone(),
                    source,
                })?;
            info!("deployment is created");
            Ok(EnsureOutcome::CreatedOnRetry)
        }
    }
}

async fn upsert(
    api: &dyn DeploymentApi,
    mut deployment: Deployment,
    options: &DeploymentOptions,
    target: &DeployTarget,
) -> Result<EnsureOutcome, EnsureError> {
    let name = &options.name;

    let existing = api
        .get_opt(name)
        .await
        .map_err(|source| EnsureError::Lookup {
            name: name.clone(),
            source,
        })?;

    match existing {
        None => {
            api.create(&deployment)
                .await
                .map_err(|source| EnsureError::Create {
                    name: name.clone(),
                    source,
                })?;
            info!(
                "{} deployment is created in namespace {}",
                name, target.namespace
            );
            Ok(EnsureOutcome::Created)
        }
        Some(current) => {
            deployment.metadata.resource_version = current.metadata.resource_version;
            api.replace(name, &deployment)
                .await
                .map_err(|source| EnsureError::Replace {
                    name: name.clone(),
                    source,
                })?;
            info!(
                "{} deployment is replaced in namespace {}",
                name, target.namespace
            );
            Ok(EnsureOutcome::Replaced)
        }
    }
}
