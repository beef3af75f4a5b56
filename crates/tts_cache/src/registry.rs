//! Provider registry
//!
//! Maps provider names to backend constructors. The host builds one registry
//! at startup, usually with [`ProviderRegistry::with_builtins`], and then only
//! reads from it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::TtsConfig;
use crate::error::SpeechError;
use crate::ports::SpeechBackend;
use crate::providers::native::NATIVE_PROVIDER;
use crate::providers::web::{GENERIC_WEB_PROVIDER, GOOGLE_PROVIDER, WATSON_PROVIDER};
use crate::providers::{CachingProvider, NativeSynthesisBackend, WebBackend, WebEndpoint};

/// Creates an unconfigured backend
pub type BackendConstructor = Arc<dyn Fn() -> Box<dyn SpeechBackend> + Send + Sync>;

/// Name to constructor mapping for speech backends
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: HashMap<String, BackendConstructor>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_names())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in backends
    ///
    /// `google`, `watson`, `web` and `native`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(GOOGLE_PROVIDER, || {
            Box::new(WebBackend::new(WebEndpoint::google()))
        });
        registry.register(WATSON_PROVIDER, || {
            Box::new(WebBackend::new(WebEndpoint::watson()))
        });
        registry.register(GENERIC_WEB_PROVIDER, || {
            Box::new(WebBackend::new(WebEndpoint::generic()))
        });
        registry.register(NATIVE_PROVIDER, || Box::new(NativeSynthesisBackend::new()));
        registry
    }

    /// Register a constructor, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn() -> Box<dyn SpeechBackend> + Send + Sync + 'static,
    {
        let name = name.into();
        if self
            .constructors
            .insert(name.clone(), Arc::new(constructor))
            .is_some()
        {
            debug!(provider = %name, "Replaced registered provider");
        }
        self
    }

    /// Whether `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered provider names in sorted order
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the backend named by `config.provider`
    ///
    /// The backend is configured with `config` and, when caching or
    /// persistence is enabled, wrapped in a [`CachingProvider`].
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` for an invalid configuration,
    /// `SpeechError::NoMatchingProvider` if the name is not registered, or the
    /// backend's own error from `configure`. Nothing touches the network or the
    /// disk before these checks pass.
    pub fn create(&self, config: &TtsConfig) -> Result<Arc<dyn SpeechBackend>, SpeechError> {
        config.validate().map_err(SpeechError::Configuration)?;

        let constructor = self
            .constructors
            .get(&config.provider)
            .ok_or_else(|| SpeechError::NoMatchingProvider(config.provider.clone()))?;

        let mut backend = constructor();
        backend.configure(config)?;

        if config.caching_enabled() {
            info!(
                provider = %config.provider,
                cache_dir = %config.cache_dir().display(),
                use_cache = config.use_cache,
                persist_results = config.persist_results,
                "Created cached speech provider"
            );
            Ok(Arc::new(CachingProvider::new(backend, config)))
        } else {
            info!(provider = %config.provider, "Created speech provider");
            Ok(Arc::from(backend))
        }
    }
}
