use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use deployer_k8s::{
    ClusterClient, EnsureMode, EnsureOutcome, KubeDeploymentApi, build_deployment,
    ensure_deployment,
};
use deployer_types::{DEFAULT_NAMESPACE, DeployTarget, DeploymentOptions, FileConfig};

const DEFAULT_KUBECONFIG: &str = "/home/ubuntu/.kube/config";

/// haproxy-deployer - Creates the HAProxy Deployment in a Kubernetes cluster
#[derive(Parser, Debug)]
#[command(name = "haproxy-deployer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Absolute path to the kubeconfig file
    #[arg(long, default_value = DEFAULT_KUBECONFIG)]
    kubeconfig: PathBuf,

    /// Namespace to create the deployment in
    #[arg(long)]
    namespace: Option<String>,

    /// TOML file with deployment overrides
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Container image
    #[arg(long)]
    image: Option<String>,

    /// Deployment name
    #[arg(long)]
    name: Option<String>,

    /// Container port
    #[arg(long)]
    port: Option<u16>,

    /// How an existing deployment is handled
    #[arg(long, value_enum, default_value_t = Mode::RetryCreate)]
    mode: Mode,

    /// Print the deployment as JSON instead of submitting it
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Create, and create again if the server answers not found
    RetryCreate,
    /// Create if absent, replace if present
    Upsert,
}

impl From<Mode> for EnsureMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::RetryCreate => EnsureMode::RetryCreate,
            Mode::Upsert => EnsureMode::Upsert,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run_app(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// Resolve options and target from defaults, the config file and flags
fn resolve(args: &Args) -> Result<(DeploymentOptions, DeployTarget)> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let mut options = DeploymentOptions::haproxy();
    options.merge(&file.deployment);
    if let Some(image) = &args.image {
        options.image = image.clone();
    }
    if let Some(name) = &args.name {
        options.name = name.clone();
    }
    if let Some(port) = args.port {
        options.port = port;
    }
    options.validate().context("Invalid deployment options")?;

    let namespace = args
        .namespace
        .clone()
        .or(file.namespace)
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    let target = DeployTarget::new(namespace);
    target.validate().context("Invalid deploy target")?;

    Ok((options, target))
}

async fn run_app(args: Args) -> Result<()> {
    let (options, target) = resolve(&args)?;

    if args.dry_run {
        let deployment = build_deployment(&options, &target);
        println!("{}", serde_json::to_string_pretty(&deployment)?);
        return Ok(());
    }

    // Uses the current context in the kubeconfig
    let cluster = ClusterClient::load(&args.kubeconfig)?;
    if let Some(ns) = cluster.namespace_hint() {
        tracing::debug!(
            context_namespace = %ns,
            target_namespace = %target.namespace,
            "namespace from kubeconfig context is ignored"
        );
    }
    let client = cluster.connect().await?;

    let api = KubeDeploymentApi::new(client, &target);
    let outcome = ensure_deployment(&api, &options, &target, args.mode.into()).await?;

    match outcome {
        EnsureOutcome::Created | EnsureOutcome::CreatedOnRetry => {
            println!("{} created in namespace {}", options.name, target.namespace)
        }
        EnsureOutcome::Replaced => {
            println!("{} replaced in namespace {}", options.name, target.namespace)
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("haproxy-deployer").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.kubeconfig, PathBuf::from("/home/ubuntu/.kube/config"));
        assert_eq!(args.mode, Mode::RetryCreate);
        assert!(!args.dry_run);

        let (options, target) = resolve(&args).unwrap();
        assert_eq!(options, DeploymentOptions::haproxy());
        assert_eq!(target, DeployTarget::new("aslan"));
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "namespace = \"edge\"\n[deployment]\nimage = \"haproxy:2.9\"\nport = 8443"
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let args = parse(&["--config", path, "--port", "9000", "--mode", "upsert"]);
        assert_eq!(EnsureMode::from(args.mode), EnsureMode::Upsert);

        let (options, target) = resolve(&args).unwrap();
        assert_eq!(options.image, "haproxy:2.9");
        assert_eq!(options.name, "haproxy-test");
        assert_eq!(options.port, 9000);
        assert_eq!(target.namespace, "edge");

        let args = parse(&["--config", path, "--namespace", "prod"]);
        let (_, target) = resolve(&args).unwrap();
        assert_eq!(target.namespace, "prod");
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let args = parse(&["--image", ""]);
        assert!(resolve(&args).is_err());

        assert!(Args::try_parse_from(["haproxy-deployer", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_empty_namespace_is_rejected() {
        let args = parse(&["--namespace", ""]);
        let err = resolve(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("namespace must not be empty"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "namespace = \"\"").unwrap();
        let args = parse(&["--config", file.path().to_str().unwrap()]);
        assert!(resolve(&args).is_err());
    }

    #[tokio::test]
    async fn test_empty_namespace_fails_dry_run() {
        let args = parse(&["--namespace", " ", "--dry-run"]);
        assert!(run_app(args).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_fails_before_any_request() {
        let args = parse(&["--kubeconfig", "/nonexistent/.kube/config"]);
        let err = run_app(args).await.unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read kubeconfig"));
    }

    #[tokio::test]
    async fn test_dry_run_skips_kubeconfig() {
        let args = parse(&["--kubeconfig", "/nonexistent/.kube/config", "--dry-run"]);
        assert!(run_app(args).await.is_ok());
    }
}
