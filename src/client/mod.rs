//! Kubernetes client construction

use crate::error::{DiagError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

/// Create a Kubernetes client for the specified context
pub async fn create_client(context: Option<&str>) -> Result<Client> {
    let config = load_config(context).await?;
    Client::try_from(config).map_err(DiagError::from)
}

/// Load Kubernetes configuration.
///
/// An explicit context always goes through the kubeconfig file; otherwise the
/// in-cluster service account is tried as well, which is how the e2e suite
/// runs inside CI pods.
async fn load_config(context: Option<&str>) -> Result<Config> {
    match context {
        Some(ctx) => {
            let kubeconfig = Kubeconfig::read()
                .map_err(|e| DiagError::Config(format!("Failed to read kubeconfig: {e}")))?;
            config_for_context(kubeconfig, ctx).await
        }
        None => Config::infer()
            .await
            .map_err(|e| DiagError::Config(format!("Failed to infer kube config: {e}"))),
    }
}

/// Client configuration for a named context of `kubeconfig`
pub async fn config_for_context(kubeconfig: Kubeconfig, context: &str) -> Result<Config> {
    let options = KubeConfigOptions {
        context: Some(context.to_string()),
        ..Default::default()
    };
    Config::from_custom_kubeconfig(kubeconfig, &options)
        .await
        .map_err(|e| DiagError::Config(format!("Failed to load kubeconfig context {context}: {e}")))
}
