//! Kubernetes Client Setup
//!
//! Builds the API client either from the in-cluster service account or, when
//! running locally, from a kubeconfig file.

use crate::error::{Error, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::PathBuf;
use tracing::info;

/// How to reach the API server
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Run outside the cluster using a kubeconfig
    pub local: bool,
    /// Kubeconfig path; the default lookup applies when unset
    pub kubeconfig: Option<PathBuf>,
}

/// Resolve the client configuration
pub async fn load_config(config: &ClientConfig) -> Result<Config> {
    if !config.local {
        info!("Using in-cluster configuration");
        return Config::incluster()
            .map_err(|e| Error::KubeConfig(format!("Error building in-cluster config: {}", e)));
    }

    let options = KubeConfigOptions::default();
    match &config.kubeconfig {
        Some(path) => {
            info!("Using kubeconfig {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::KubeConfig(format!("Error reading kubeconfig {}: {}", path.display(), e))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| {
                    Error::KubeConfig(format!(
                        "Error creating config from kubeconfig {}: {}",
                        path.display(),
                        e
                    ))
                })
        }
        None => {
            info!("Using default kubeconfig");
            Config::from_kubeconfig(&options)
                .await
                .map_err(|e| Error::KubeConfig(format!("Error loading default kubeconfig: {}", e)))
        }
    }
}

/// Build the API client
pub async fn build_client(config: &ClientConfig) -> Result<Client> {
    let config = load_config(config).await?;
    Ok(Client::try_from(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: local
  cluster:
    server: https://127.0.0.1:6443
    insecure-skip-tls-verify: true
contexts:
- name: local
  context:
    cluster: local
    user: tester
    namespace: tagging
current-context: local
users:
- name: tester
  user:
    token: not-a-real-token
"#;

    fn kubeconfig_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_local_kubeconfig() {
        let file = kubeconfig_file(KUBECONFIG);
        let config = load_config(&ClientConfig {
            local: true,
            kubeconfig: Some(file.path().to_path_buf()),
        })
        .await
        .unwrap();

        assert_eq!(config.cluster_url.host(), Some("127.0.0.1"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
        assert_eq!(config.default_namespace, "tagging");
    }

    #[tokio::test]
    async fn test_invalid_kubeconfig() {
        let file = kubeconfig_file("clusters: [this is not: valid");
        let result = load_config(&ClientConfig {
            local: true,
            kubeconfig: Some(file.path().to_path_buf()),
        })
        .await;

        assert_matches!(result, Err(Error::KubeConfig(_)));
    }

    #[tokio::test]
    async fn test_missing_kubeconfig() {
        let result = load_config(&ClientConfig {
            local: true,
            kubeconfig: Some(PathBuf::from("/nonexistent/kubeconfig")),
        })
        .await;

        assert_matches!(result, Err(Error::KubeConfig(msg)) if msg.contains("/nonexistent/kubeconfig"));
    }
}
