//! Name → provider lookup, built once at process start.

use std::collections::BTreeMap;
use std::sync::Arc;

use lectern_core::{AudioSettings, VoiceSettings};

use crate::error::TtsError;
use crate::provider::TtsProvider;
use crate::providers::{
    AliyunConfig, AliyunProvider, MinimaxConfig, MinimaxProvider, VolcengineConfig,
    VolcengineProvider,
};

/// Immutable map of registered providers.
///
/// Reads need no locking; the registry is shared behind an `Arc` or by
/// reference once built.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn TtsProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    /// Register every built-in provider, configured from the process environment.
    ///
    /// Providers without credentials are still registered so they can be
    /// listed; [`prepare`](Self::prepare) refuses them.
    pub fn from_env() -> Result<Self, TtsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TtsError> {
        let registry = Self::builder()
            .register(MinimaxProvider::new(MinimaxConfig::from_lookup(&lookup))?)
            .register(VolcengineProvider::new(VolcengineConfig::from_lookup(
                &lookup,
            ))?)
            .register(AliyunProvider::new(AliyunConfig::from_lookup(&lookup))?)
            .build();

        for provider in registry.providers.values() {
            tracing::debug!(
                provider = provider.name(),
                configured = provider.is_configured(),
                "Registered speech provider"
            );
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TtsProvider>> {
        self.providers.get(name).cloned()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TtsProvider>> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Resolve a provider and validate a request against it up front.
    ///
    /// Unknown names, missing credentials and out-of-catalog parameters all
    /// fail here, before any synthesis is attempted.
    pub fn prepare(
        &self,
        name: &str,
        voice: &VoiceSettings,
        audio: &AudioSettings,
        model: &str,
    ) -> Result<Arc<dyn TtsProvider>, TtsError> {
        let provider = self
            .get(name)
            .ok_or_else(|| TtsError::UnknownProvider(name.to_string()))?;
        if !provider.is_configured() {
            return Err(TtsError::NotConfigured {
                provider: name.to_string(),
                reason: "credentials are missing".to_string(),
            });
        }
        provider.validate(voice, audio, model)?;
        Ok(provider)
    }
}

/// Collects providers before freezing them into a [`ProviderRegistry`].
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: BTreeMap<String, Arc<dyn TtsProvider>>,
}

impl ProviderRegistryBuilder {
    /// Add a provider; a later registration under the same name wins.
    #[must_use]
    pub fn register(self, provider: impl TtsProvider + 'static) -> Self {
        self.register_arc(Arc::new(provider))
    }

    #[must_use]
    pub fn register_arc(mut self, provider: Arc<dyn TtsProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    #[must_use]
    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            providers: self.providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let owned: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| {
            owned
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_registers_all_builtins() {
        let registry = ProviderRegistry::from_lookup(env(&[])).unwrap();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["aliyun", "minimax", "volcengine"]
        );
        assert!(registry.iter().all(|p| !p.is_configured()));
    }

    #[test]
    fn test_prepare_unknown_provider() {
        let registry = ProviderRegistry::from_lookup(env(&[])).unwrap();
        let err = registry
            .prepare(
                "acme",
                &VoiceSettings::new("x"),
                &AudioSettings::default(),
                "m",
            )
            .err()
            .expect("expected prepare to fail");
        assert!(matches!(err, TtsError::UnknownProvider(_)));
    }

    #[test]
    fn test_prepare_unconfigured_provider() {
        let registry = ProviderRegistry::from_lookup(env(&[])).unwrap();
        let err = registry
            .prepare(
                "minimax",
                &VoiceSettings::new("female-tianmei"),
                &AudioSettings::default(),
                "speech-01-turbo",
            )
            .err()
            .expect("expected prepare to fail");
        assert!(matches!(err, TtsError::NotConfigured { .. }));
    }

    #[test]
    fn test_prepare_validates_parameters() {
        let registry = ProviderRegistry::from_lookup(env(&[
            ("MINIMAX_API_KEY", "k"),
            ("MINIMAX_GROUP_ID", "g"),
        ]))
        .unwrap();

        let ok = registry.prepare(
            "minimax",
            &VoiceSettings::new("female-tianmei"),
            &AudioSettings::default(),
            "speech-01-turbo",
        );
        assert!(ok.is_ok());

        let err = registry
            .prepare(
                "minimax",
                &VoiceSettings::new("female-tianmei").with_pitch(40.0),
                &AudioSettings::default(),
                "speech-01-turbo",
            )
            .err()
            .expect("expected prepare to fail");
        assert!(matches!(err, TtsError::Validation { .. }));
    }
}
