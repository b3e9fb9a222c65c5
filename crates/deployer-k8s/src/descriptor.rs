//! Deployment descriptor for the HAProxy container

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{
    Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment,
};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use deployer_types::{DeployTarget, DeploymentOptions};

/// CPU limit applied to the container regardless of options
pub const CPU_LIMIT: &str = "200m";

/// Memory limit applied to the container regardless of options
pub const MEMORY_LIMIT: &str = "512Mi";

/// Argument the container is started with
pub const CONFD_ARG: &str = "--confd";

/// Environment variable pointing the container at etcd
pub const ETCD_HOST_ENV: &str = "PATRONI_ETCD_HOST";

const REPLICAS: i32 = 1;
const MAX_UNAVAILABLE: i32 = 0;
const MAX_SURGE: i32 = 1;

/// Build the Deployment submitted to the cluster
pub fn build_deployment(options: &DeploymentOptions, target: &DeployTarget) -> Deployment {
    let labels = BTreeMap::from([("app".to_string(), options.name.clone())]);

    Deployment {
        metadata: ObjectMeta {
            name: Some(options.name.clone()),
            namespace: Some(target.namespace.clone()),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(REPLICAS),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..LabelSelector::default()
            },
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_unavailable: Some(IntOrString::Int(MAX_UNAVAILABLE)),
                    max_surge: Some(IntOrString::Int(MAX_SURGE)),
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    name: Some(options.name.clone()),
                    labels: Some(labels),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![haproxy_container(options, target)],
                    restart_policy: Some("Always".to_string()),
                    dns_policy: Some("ClusterFirst".to_string()),
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}

fn haproxy_container(options: &DeploymentOptions, target: &DeployTarget) -> Container {
    let limits = BTreeMap::from([
        ("cpu".to_string(), Quantity(CPU_LIMIT.to_string())),
        ("memory".to_string(), Quantity(MEMORY_LIMIT.to_string())),
    ]);

    Container {
        name: options.name.clone(),
        image: Some(options.image.clone()),
        ports: Some(vec![ContainerPort {
            container_port: i32::from(options.port),
            protocol: Some("TCP".to_string()),
            ..ContainerPort::default()
        }]),
        args: Some(vec![CONFD_ARG.to_string()]),
        env: Some(vec![EnvVar {
            name: ETCD_HOST_ENV.to_string(),
            value: Some(target.etcd_endpoint()),
            ..EnvVar::default()
        }]),
        resources: Some(ResourceRequirements {
            limits: Some(limits),
            ..ResourceRequirements::default()
        }),
        image_pull_policy: Some("IfNotPresent".to_string()),
        ..Container::default()
    }
}
