use crate::application::registry::CalculatorRegistry;
use crate::domain::calculator::Calculator;
use crate::domain::ports::{CalculatorResolver, PostalCodeDirectoryBox};
use crate::domain::postal_code::PostalCode;
use crate::error::{Result, TaxError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What to do when the directory cannot place a postal code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPolicy {
    /// Used when the request carries no postal code.
    pub default_calculator: Option<String>,
    /// Used when a non-empty postal code is not in the directory.
    pub fallback_calculator: Option<String>,
}

/// Resolves postal codes by exact match against a [`PostalCodeDirectory`].
///
/// Directory hits are kept in a read-through cache shared by all requests.
/// The cache is tagged with the directory generation it was filled from and
/// is dropped as soon as the directory reports a newer one.
///
/// [`PostalCodeDirectory`]: crate::domain::ports::PostalCodeDirectory
pub struct PostalCodeResolver {
    directory: PostalCodeDirectoryBox,
    registry: CalculatorRegistry,
    policy: ResolutionPolicy,
    cache: RwLock<ResolverCache>,
}

#[derive(Default)]
struct ResolverCache {
    generation: u64,
    entries: HashMap<PostalCode, Arc<dyn Calculator>>,
}

impl PostalCodeResolver {
    /// Fails with [`TaxError::ConfigError`] if the policy names a calculator
    /// the registry does not know.
    pub fn new(
        directory: PostalCodeDirectoryBox,
        registry: CalculatorRegistry,
        policy: ResolutionPolicy,
    ) -> Result<Self> {
        for id in [&policy.default_calculator, &policy.fallback_calculator]
            .into_iter()
            .flatten()
        {
            if !registry.contains(id) {
                return Err(TaxError::ConfigError(format!(
                    "resolution policy names unknown calculator '{}'",
                    id
                )));
            }
        }

        Ok(Self {
            directory,
            registry,
            policy,
            cache: RwLock::new(ResolverCache::default()),
        })
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.entries.len()
    }

    /// A missing calculator is a configuration fault, not a caller error.
    fn calculator(&self, id: &str) -> Result<Arc<dyn Calculator>> {
        self.registry.get(id).ok_or_else(|| {
            TaxError::ConfigError(format!("calculator '{}' is not registered", id))
        })
    }
}

#[async_trait]
impl CalculatorResolver for PostalCodeResolver {
    async fn resolve(&self, postal_code: &PostalCode) -> Result<Arc<dyn Calculator>> {
        if postal_code.is_empty() {
            return match &self.policy.default_calculator {
                Some(id) => self.calculator(id),
                None => Err(TaxError::ResolutionError(
                    "A postal code is required".to_string(),
                )),
            };
        }

        let generation = self.directory.generation();
        {
            let cache = self.cache.read().await;
            if cache.generation == generation
                && let Some(calculator) = cache.entries.get(postal_code)
            {
                return Ok(Arc::clone(calculator));
            }
        }

        match self.directory.calculator_for(postal_code).await? {
            Some(id) => {
                let calculator = self.calculator(&id)?;
                let mut cache = self.cache.write().await;
                if cache.generation < generation {
                    cache.entries.clear();
                    cache.generation = generation;
                }
                if cache.generation == generation {
                    cache
                        .entries
                        .insert(postal_code.clone(), Arc::clone(&calculator));
                }
                Ok(calculator)
            }
            None => match &self.policy.fallback_calculator {
                Some(id) => self.calculator(id),
                None => Err(TaxError::ResolutionError(format!(
                    "No calculator is configured for postal code '{}'",
                    postal_code
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calculator::TaxRule;
    use crate::domain::ports::PostalCodeDirectory;
    use crate::infrastructure::in_memory::InMemoryPostalCodeDirectory;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> CalculatorRegistry {
        let mut registry = CalculatorRegistry::new();
        registry
            .register_rule("FlatRate", TaxRule::FlatRate { rate: dec!(0.175) })
            .unwrap();
        registry
            .register_rule("Flat-10%", TaxRule::FlatRate { rate: dec!(0.10) })
            .unwrap();
        registry
    }

    fn directory() -> InMemoryPostalCodeDirectory {
        let directory = InMemoryPostalCodeDirectory::new();
        directory.insert("0000", "Flat-10%");
        directory.insert("7000", "FlatRate");
        directory
    }

    /// Counts lookups so cache hits can be observed.
    struct CountingDirectory {
        inner: InMemoryPostalCodeDirectory,
        lookups: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PostalCodeDirectory for CountingDirectory {
        async fn calculator_for(&self, postal_code: &PostalCode) -> Result<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.calculator_for(postal_code).await
        }
    }

    #[tokio::test]
    async fn test_exact_match_after_normalization() {
        let resolver = PostalCodeResolver::new(
            Box::new(directory()),
            registry(),
            ResolutionPolicy::default(),
        )
        .unwrap();

        let calculator = resolver
            .resolve(&PostalCode::normalize(" 0000 "))
            .await
            .unwrap();
        assert_eq!(calculator.id(), "Flat-10%");

        // No prefix matching.
        let err = resolver
            .resolve(&PostalCode::normalize("00001"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TaxError::ResolutionError(_)));
    }

    #[tokio::test]
    async fn test_empty_postal_code_uses_default() {
        let policy = ResolutionPolicy {
            default_calculator: Some("FlatRate".to_string()),
            fallback_calculator: None,
        };
        let resolver = PostalCodeResolver::new(Box::new(directory()), registry(), policy).unwrap();

        let calculator = resolver.resolve(&PostalCode::default()).await.unwrap();
        assert_eq!(calculator.id(), "FlatRate");
    }

    #[tokio::test]
    async fn test_empty_postal_code_without_default_fails() {
        let resolver = PostalCodeResolver::new(
            Box::new(directory()),
            registry(),
            ResolutionPolicy::default(),
        )
        .unwrap();

        assert!(matches!(
            resolver.resolve(&PostalCode::default()).await,
            Err(TaxError::ResolutionError(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_postal_code_uses_fallback() {
        let policy = ResolutionPolicy {
            default_calculator: None,
            fallback_calculator: Some("Flat-10%".to_string()),
        };
        let resolver = PostalCodeResolver::new(Box::new(directory()), registry(), policy).unwrap();

        let calculator = resolver
            .resolve(&PostalCode::normalize("9999"))
            .await
            .unwrap();
        assert_eq!(calculator.id(), "Flat-10%");
        // Fallbacks are not cached.
        assert_eq!(resolver.cached_len().await, 0);
    }

    #[tokio::test]
    async fn test_directory_hits_are_cached() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let directory = CountingDirectory {
            inner: directory(),
            lookups: Arc::clone(&lookups),
        };
        let resolver =
            PostalCodeResolver::new(Box::new(directory), registry(), ResolutionPolicy::default())
                .unwrap();

        for _ in 0..3 {
            let calculator = resolver
                .resolve(&PostalCode::normalize("7000"))
                .await
                .unwrap();
            assert_eq!(calculator.id(), "FlatRate");
        }

        assert_eq!(lookups.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cached_len().await, 1);
    }

    #[tokio::test]
    async fn test_cached_postal_code_follows_directory_change() {
        let directory = directory();
        let resolver = PostalCodeResolver::new(
            Box::new(directory.clone()),
            registry(),
            ResolutionPolicy::default(),
        )
        .unwrap();
        let code = PostalCode::normalize("0000");

        assert_eq!(resolver.resolve(&code).await.unwrap().id(), "Flat-10%");
        assert_eq!(resolver.cached_len().await, 1);

        directory.insert("0000", "FlatRate");
        assert_eq!(resolver.resolve(&code).await.unwrap().id(), "FlatRate");

        // Cached again under the new generation.
        assert_eq!(resolver.resolve(&code).await.unwrap().id(), "FlatRate");
        assert_eq!(resolver.cached_len().await, 1);
    }

    #[tokio::test]
    async fn test_directory_naming_unknown_calculator() {
        let directory = directory();
        directory.insert("5555", "Missing");
        let resolver =
            PostalCodeResolver::new(Box::new(directory), registry(), ResolutionPolicy::default())
                .unwrap();

        let err = resolver
            .resolve(&PostalCode::normalize("5555"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TaxError::ConfigError(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_policy_with_unknown_calculator_rejected() {
        let policy = ResolutionPolicy {
            default_calculator: Some("Nope".to_string()),
            fallback_calculator: None,
        };
        assert!(matches!(
            PostalCodeResolver::new(Box::new(directory()), registry(), policy),
            Err(TaxError::ConfigError(_))
        ));
    }
}
