//! Provider registry.

use crate::error::ProviderError;
use crate::provider::{CreateRequest, Fields, Provider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Routes creation calls to the provider registered for a kind's package.
///
/// Resource kinds follow the `package:module/type:Type` convention; the part
/// before the first `:` selects the provider.
///
/// ```
/// # use std::sync::Arc;
/// # use stratus_provider::{ProviderRegistry, SimulatedCloud};
/// let mut registry = ProviderRegistry::new();
/// registry.register("aws", Arc::new(SimulatedCloud::new()));
///
/// assert!(registry.has_provider("aws"));
/// ```
#[derive(Default)]
pub struct ProviderRegistry {
    // Maps package names to implementations.
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl core::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_names())
            .finish()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Registers a provider for a package.
    ///
    /// # Panics
    ///
    /// Panics if a provider with the same package name is already registered.
    pub fn register<P: Provider>(&mut self, package: impl Into<String>, provider: Arc<P>) {
        let package = package.into();
        assert!(
            !self.providers.contains_key(&package),
            "provider for package '{package}' is already registered"
        );
        self.providers
            .insert(package, provider as Arc<dyn Provider>);
    }

    /// Returns the provider registered for a package.
    #[must_use]
    pub fn get(&self, package: impl AsRef<str>) -> Option<Arc<dyn Provider>> {
        self.providers.get(package.as_ref()).cloned()
    }

    /// Checks if a provider is registered for a package.
    #[must_use]
    pub fn has_provider(&self, package: impl AsRef<str>) -> bool {
        self.providers.contains_key(package.as_ref())
    }

    /// Lists registered package names, sorted.
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    fn route(&self, request: &CreateRequest) -> Result<Arc<dyn Provider>, ProviderError> {
        let package = request
            .package()
            .ok_or_else(|| ProviderError::MalformedKind(request.kind.clone()))?;

        self.get(package)
            .ok_or_else(|| ProviderError::UnknownProvider {
                package: package.to_string(),
                kind: request.kind.clone(),
            })
    }
}

#[async_trait]
impl Provider for ProviderRegistry {
    async fn create(&self, request: CreateRequest) -> Result<Fields, ProviderError> {
        let provider = self.route(&request)?;
        provider.create(request).await
    }
}
