//! Registry aggregation across config-declared modules and remote providers.
//!
//! Module tools are registered first, then each provider's OpenAPI tools in
//! configured order. Providers are fetched concurrently; a provider that
//! fails is logged and skipped.

use std::time::Duration;

use reqwest::Client as HttpClient;

use super::errors::RegistryError;
use super::openapi::descriptors_from_openapi;
use super::tool_registry::ToolRegistry;
use super::types::{group_description, join_url, OriginKind, ToolDescriptor};
use crate::config::{AppConfig, ModuleConfig, ProviderConfig};

/// Timeout for fetching one provider's `/openapi.json`.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RegistryAggregator {
    http: HttpClient,
    providers: Vec<ProviderConfig>,
    modules: Vec<ModuleConfig>,
}

impl RegistryAggregator {
    pub fn new(
        providers: Vec<ProviderConfig>,
        modules: Vec<ModuleConfig>,
    ) -> Result<Self, RegistryError> {
        let http = HttpClient::builder()
            .timeout(DISCOVERY_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::HttpClient {
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            providers,
            modules,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, RegistryError> {
        Self::new(config.providers.clone(), config.modules.clone())
    }

    /// Build a fresh registry.
    ///
    /// Never fails: zero reachable providers yields a registry holding only
    /// the module tools (possibly empty).
    pub async fn aggregate(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();

        for module in &self.modules {
            let kept = registry.register_all(module_descriptors(module));
            tracing::info!(module = %module.name, tools = kept, "registered module tools");
        }

        let (fetched, errors) = self.fetch_all().await;
        for (provider, err) in &errors {
            tracing::warn!(provider = %provider, error = %err, "provider skipped (non-fatal)");
        }
        for (provider, descriptors) in fetched {
            let offered = descriptors.len();
            let kept = registry.register_all(descriptors);
            tracing::info!(provider = %provider, offered, kept, "registered provider tools");
        }

        tracing::info!(
            total_tools = registry.len(),
            failed_providers = errors.len(),
            "tool registry built"
        );
        registry
    }

    /// Fetch every provider concurrently, returning successes in configured
    /// order alongside the failures.
    async fn fetch_all(
        &self,
    ) -> (
        Vec<(String, Vec<ToolDescriptor>)>,
        Vec<(String, RegistryError)>,
    ) {
        let mut handles = Vec::new();
        for provider in &self.providers {
            let http = self.http.clone();
            let provider = provider.clone();
            handles.push((
                provider.name.clone(),
                tokio::spawn(async move { fetch_provider(&http, &provider).await }),
            ));
        }

        let mut fetched = Vec::new();
        let mut errors = Vec::new();
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(descriptors)) => fetched.push((name, descriptors)),
                Ok(Err(e)) => errors.push((name, e)),
                Err(e) => {
                    errors.push((
                        name.clone(),
                        RegistryError::ProviderUnreachable {
                            provider: name,
                            url: String::new(),
                            reason: format!("join error: {e}"),
                        },
                    ));
                }
            }
        }
        (fetched, errors)
    }
}

/// `GET {base_url}/openapi.json` and walk it.
async fn fetch_provider(
    http: &HttpClient,
    provider: &ProviderConfig,
) -> Result<Vec<ToolDescriptor>, RegistryError> {
    let url = join_url(&provider.base_url, "openapi.json");
    let unreachable_err = |reason: String| RegistryError::ProviderUnreachable {
        provider: provider.name.clone(),
        url: url.clone(),
        reason,
    };

    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| unreachable_err(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(unreachable_err(format!("HTTP {status}")));
    }

    let doc: serde_json::Value = response.json().await.map_err(|e| RegistryError::InvalidSchema {
        provider: provider.name.clone(),
        reason: e.to_string(),
    })?;

    descriptors_from_openapi(&doc, &provider.name, &provider.base_url)
}

/// Descriptors for a config-declared module.
fn module_descriptors(module: &ModuleConfig) -> Vec<ToolDescriptor> {
    module
        .tools
        .iter()
        .map(|tool| ToolDescriptor {
            name: tool.name.clone(),
            description: group_description(&module.name, &tool.description),
            parameter_schema: tool.parameters.clone(),
            group: module.name.clone(),
            origin: OriginKind::Module,
            provider_endpoint: module.base_url.clone(),
            invocation_path: tool
                .path
                .clone()
                .unwrap_or_else(|| format!("/{}", tool.name)),
            method: "POST".to_string(),
        })
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
