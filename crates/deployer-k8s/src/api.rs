//! Deployment API seam

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::Api;
use kube::api::PostParams;

use deployer_types::DeployTarget;

/// Cluster operations the ensurer needs on Deployments in one namespace
///
/// Implemented over `kube::Api` in production and by a fake in tests.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Submit a create request
    async fn create(&self, deployment: &Deployment) -> Result<Deployment, kube::Error>;

    /// Fetch a deployment, `None` if it does not exist
    async fn get_opt(&self, name: &str) -> Result<Option<Deployment>, kube::Error>;

    /// Replace an existing deployment
    async fn replace(
        &self,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, kube::Error>;
}

/// `DeploymentApi` backed by a live cluster
pub struct KubeDeploymentApi {
    api: Api<Deployment>,
}

impl KubeDeploymentApi {
    pub fn new(client: kube::Client, target: &DeployTarget) -> Self {
        Self {
            api: Api::namespaced(client, &target.namespace),
        }
    }
}

#[async_trait]
impl DeploymentApi for KubeDeploymentApi {
    async fn create(&self, deployment: &Deployment) -> Result<Deployment, kube::Error> {
        self.api.create(&PostParams::default(), deployment).await
    }

    async fn get_opt(&self, name: &str) -> Result<Option<Deployment>, kube::Error> {
        self.api.get_opt(name).await
    }

    async fn replace(
        &self,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, kube::Error> {
        self.api.replace(name, &PostParams::default(), deployment).await
    }
}

/// Whether the API server answered 404
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("deployments.apps \"haproxy-test\" {}", reason),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_is_not_found() {
        assert!(is_not_found(&api_error(404, "NotFound")));
        assert!(!is_not_found(&api_error(409, "AlreadyExists")));
        assert!(!is_not_found(&api_error(403, "Forbidden")));
        assert!(!is_not_found(&kube::Error::Service("connection refused".into())));
    }
}
