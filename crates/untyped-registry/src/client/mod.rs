//! HTTP client implementation with connection pooling and retry logic

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use untyped_core::error::UntypedError;
use untyped_core::types::PackageManifest;

use crate::api::{ManifestSource, TarballSource};
use crate::retry::RetryPolicy;
use crate::RegistryResult;

/// Default npm registry URL
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Transport settings for the registry client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base registry URL
    pub base_url: String,
    /// Whole-request timeout, body included
    pub timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
    /// Treat 404 as a transient failure instead of a missing package
    pub retry_not_found: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("untyped/", env!("CARGO_PKG_VERSION")).to_string(),
            retry_not_found: false,
        }
    }
}

/// HTTP client for npm registry operations
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry policy for manifest fetches
    retry_policy: RetryPolicy,
    /// Base registry URL, without trailing slash
    base_url: String,
    retry_not_found: bool,
}

impl RegistryClient {
    /// Create a registry client for the public npm registry
    pub fn new() -> RegistryResult<Self> {
        Self::with_config(ClientConfig::default(), RetryPolicy::default())
    }

    /// Create registry client with custom configuration
    pub fn with_config(config: ClientConfig, retry_policy: RetryPolicy) -> RegistryResult<Self> {
        url::Url::parse(&config.base_url).map_err(|e| UntypedError::ConfigValidation {
            field: "registry.url".to_string(),
            reason: format!("'{}' is not a valid URL: {}", config.base_url, e),
        })?;

        let client = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| UntypedError::network("Failed to create HTTP client".to_string(), e))?;

        Ok(Self {
            client,
            retry_policy,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry_not_found: config.retry_not_found,
        })
    }

    /// Base registry URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retry policy applied to manifest fetches
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// URL of the manifest for one version or dist-tag
    fn manifest_url(&self, name: &str, version: &str) -> String {
        format!("{}/{}/{}", self.base_url, name, version)
    }
}

impl RegistryClient {
    /// Fetch a version manifest, retrying transient failures per the retry policy
    pub async fn fetch_manifest(&self, name: &str, version: &str) -> RegistryResult<PackageManifest> {
        let url = self.manifest_url(name, version);
        let description = format!("fetch manifest {}@{}", name, version);

        self.retry_policy
            .run(&description, |attempt| {
                debug!(%url, attempt, "Fetching manifest");
                self.fetch_manifest_once(&url, name, version)
            })
            .await
    }

    async fn fetch_manifest_once(&self, url: &str, name: &str, version: &str) -> RegistryResult<PackageManifest> {
        let package = format!("{}@{}", name, version);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| UntypedError::network(format!("Failed to fetch manifest for {}", package), e))?;

        match response.status() {
            StatusCode::OK => {},
            StatusCode::NOT_FOUND if self.retry_not_found => {
                return Err(UntypedError::Network {
                    message: format!("Registry returned status 404 for {}", package),
                    source: None,
                })
            },
            StatusCode::NOT_FOUND => {
                return Err(UntypedError::PackageNotFound {
                    name: name.to_string(),
                    version: version.to_string(),
                })
            },
            status => {
                return Err(UntypedError::Network {
                    message: format!("Registry returned status {} for {}", status, package),
                    source: None,
                })
            },
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UntypedError::network(format!("Failed to read manifest for {}", package), e))?;

        let manifest: PackageManifest =
            serde_json::from_slice(&body).map_err(|e| UntypedError::MalformedResponse {
                package: package.clone(),
                message: e.to_string(),
            })?;

        if manifest.name != name {
            return Err(UntypedError::MalformedResponse {
                package,
                message: format!("manifest is for '{}'", manifest.name),
            });
        }

        Ok(manifest)
    }

    /// Stream a tarball into `dest` in a single attempt
    pub async fn fetch_tarball(&self, url: &str, dest: &Path) -> RegistryResult<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UntypedError::network(format!("Failed to download {}", url), e))?;

        if !response.status().is_success() {
            return Err(UntypedError::Network {
                message: format!("Tarball download returned status {} for {}", response.status(), url),
                source: None,
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| UntypedError::io(format!("Failed to create {}", dest.display()), e))?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| UntypedError::network(format!("Failed to read tarball body from {}", url), e))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| UntypedError::io(format!("Failed to write {}", dest.display()), e))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| UntypedError::io(format!("Failed to flush {}", dest.display()), e))?;

        debug!(%url, bytes = written, "Downloaded tarball");
        Ok(written)
    }
}

#[async_trait]
impl ManifestSource for RegistryClient {
    async fn fetch_manifest(&self, name: &str, version: &str) -> RegistryResult<PackageManifest> {
        RegistryClient::fetch_manifest(self, name, version).await
    }
}

#[async_trait]
impl TarballSource for RegistryClient {
    async fn fetch_tarball(&self, url: &str, dest: &Path) -> RegistryResult<u64> {
        RegistryClient::fetch_tarball(self, url, dest).await
    }
}

#[cfg(test)]
mod tests;
