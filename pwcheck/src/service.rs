use std::sync::Arc;
use std::time::Duration;

use pwcheck_breach::{BreachAggregator, BreachProvider, HashDataset, RemoteBreachClient};
use pwcheck_store::{CredentialStore, StoredPassword};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Error;
use crate::generator::{Generator, GeneratorPolicy};
use crate::strength::{Evaluator, Finding, Policy, Strength};

/// The outcome of checking one password.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub strength: Strength,
    pub findings: Vec<Finding>,
    pub breached: bool,
}

/// Everything the CLI can do, behind one facade.
pub struct Service {
    evaluator: Evaluator,
    generator: Generator,
    breach: Arc<dyn BreachProvider>,
    breach_deadline: Duration,
    store: Option<Arc<CredentialStore>>,
}

impl Service {
    pub fn new(
        evaluator: Evaluator,
        generator: Generator,
        breach: Arc<dyn BreachProvider>,
        breach_deadline: Duration,
    ) -> Self {
        Self { evaluator, generator, breach, breach_deadline, store: None }
    }

    /// Builds the service from configuration.
    ///
    /// Breach providers are ordered cheapest first: the embedded dataset, then an
    /// optional offline hash list, then the remote API unless running offline.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let evaluator = Evaluator::new(Policy { min_length: config.password.min_length })?;
        let generator = Generator::new(GeneratorPolicy {
            min_length: config.generator.min_length,
            bits_per_character: config.generator.bits_per_character,
            special_charset: config.generator.special_characters.clone(),
        })?;

        let mut providers: Vec<Arc<dyn BreachProvider>> = vec![Arc::new(HashDataset::global()?)];
        if let Some(path) = &config.breach.dataset_path {
            let dataset = HashDataset::load("Offline hash list", path)?;
            debug!(path = %path.display(), hashes = dataset.len(), "loaded offline dataset");
            providers.push(Arc::new(dataset));
        }
        if !config.breach.offline {
            providers.push(Arc::new(RemoteBreachClient::new(
                &config.breach.base_url,
                &config.breach.user_agent,
                config.breach.timeout,
            )?));
        }
        let breach = BreachAggregator::from_providers(providers)?;

        Ok(Self::new(evaluator, generator, Arc::new(breach), config.breach.deadline()))
    }

    /// Attaches a credential store, enabling [`Service::save_password`] and
    /// [`Service::list_saved_passwords`].
    pub fn with_store(mut self, store: CredentialStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn password_length_for(&self, bits: u32) -> usize {
        self.generator.length_for(bits)
    }

    /// Rates the password and checks it against the breach providers.
    ///
    /// The breach check must answer within the configured deadline; a timeout or a
    /// provider failure is an error, never a "not breached".
    pub async fn evaluate_password(&self, password: &str) -> Result<Assessment, Error> {
        if password.is_empty() {
            return Err(Error::Validation("password must not be empty".into()));
        }

        let (strength, findings) = self.evaluator.evaluate(password);
        let breached =
            match tokio::time::timeout(self.breach_deadline, self.breach.is_breached(password))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(Error::BreachTimeout(self.breach_deadline)),
            };

        Ok(Assessment { strength, findings, breached })
    }

    pub fn generate_password(&self, bits: u32) -> Result<String, Error> {
        self.generator.generate(bits)
    }

    pub async fn save_password(
        &self,
        label: &str,
        password: &str,
    ) -> Result<StoredPassword, Error> {
        let store = self.store()?;
        let (label, password) = (label.to_string(), password.to_string());

        let record =
            tokio::task::spawn_blocking(move || store.save(&label, &password)).await??;
        info!(label = %record.label, "credential stored");
        Ok(record)
    }

    pub async fn list_saved_passwords(&self) -> Result<Vec<StoredPassword>, Error> {
        let store = self.store()?;
        Ok(tokio::task::spawn_blocking(move || store.list()).await??)
    }

    fn store(&self) -> Result<Arc<CredentialStore>, Error> {
        self.store.clone().ok_or(Error::StorageDisabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    struct SlowProvider;

    #[async_trait]
    impl BreachProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn is_breached(&self, _password: &str) -> Result<bool, pwcheck_breach::Error> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(false)
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl BreachProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn is_breached(&self, _password: &str) -> Result<bool, pwcheck_breach::Error> {
            Err(pwcheck_breach::Error::RateLimited { status: "429 Too Many Requests".into() })
        }
    }

    fn offline_config(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.breach.offline = true;
        config.storage.path = dir.path().join("passwords.json");
        config
    }

    fn service_with(breach: Arc<dyn BreachProvider>, deadline: Duration) -> Service {
        Service::new(
            Evaluator::new(Policy { min_length: 12 }).unwrap(),
            Generator::new(GeneratorPolicy {
                min_length: 16,
                bits_per_character: 5.95,
                special_charset: "!@#".into(),
            })
            .unwrap(),
            breach,
            deadline,
        )
    }

    #[tokio::test]
    async fn test_evaluate_breached_password() {
        let dir = tempfile::tempdir().unwrap();
        let service = Service::from_config(&offline_config(&dir)).unwrap();

        let assessment = service.evaluate_password("123456").await.unwrap();
        assert!(assessment.breached);
        assert_eq!(assessment.strength, Strength::Weak);
    }

    #[tokio::test]
    async fn test_evaluate_clean_password() {
        let dir = tempfile::tempdir().unwrap();
        let service = Service::from_config(&offline_config(&dir)).unwrap();

        let assessment = service.evaluate_password("Aa1!complexPASSXX").await.unwrap();
        assert!(!assessment.breached);
        assert_eq!(assessment.strength, Strength::Strong);
        assert!(assessment.findings.is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let service = Service::from_config(&offline_config(&dir)).unwrap();
        assert!(matches!(service.evaluate_password("").await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_offline_dataset_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let hashes = dir.path().join("hashes.txt");
        // SHA1("correct horse battery staple")
        std::fs::write(&hashes, "abf7aad6438836dbe526aa231abde2d0eef74d42\n").unwrap();

        let mut config = offline_config(&dir);
        config.breach.dataset_path = Some(hashes);
        let service = Service::from_config(&config).unwrap();

        let assessment = service.evaluate_password("correct horse battery staple").await.unwrap();
        assert!(assessment.breached);
    }

    #[tokio::test]
    async fn test_breach_deadline() {
        let service = service_with(Arc::new(SlowProvider), Duration::from_millis(50));
        let err = service.evaluate_password("Aa1!complexPASSXX").await.unwrap_err();
        assert!(matches!(err, Error::BreachTimeout(_)));
    }

    #[tokio::test]
    async fn test_breach_failure_is_not_safe() {
        let service = service_with(Arc::new(FailingProvider), Duration::from_secs(1));
        let err = service.evaluate_password("Aa1!complexPASSXX").await.unwrap_err();
        assert!(matches!(err, Error::Breach(pwcheck_breach::Error::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_generate() {
        let dir = tempfile::tempdir().unwrap();
        let service = Service::from_config(&offline_config(&dir)).unwrap();

        let password = service.generate_password(128).unwrap();
        assert_eq!(password.chars().count(), service.password_length_for(128));
        assert!(service.generate_password(0).is_err());
    }

    #[tokio::test]
    async fn test_storage_requires_store() {
        let dir = tempfile::tempdir().unwrap();
        let service = Service::from_config(&offline_config(&dir)).unwrap();

        assert!(matches!(service.save_password("mail", "x").await, Err(Error::StorageDisabled)));
        assert!(matches!(service.list_saved_passwords().await, Err(Error::StorageDisabled)));
    }

    #[tokio::test]
    async fn test_save_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(&dir);
        let store = CredentialStore::open(&config.storage.path).unwrap();
        let service = Service::from_config(&config).unwrap().with_store(store);

        service.save_password("banana", "1").await.unwrap();
        service.save_password("Apple", "2").await.unwrap();
        service.save_password("BANANA", "3").await.unwrap();

        let entries = service.list_saved_passwords().await.unwrap();
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["Apple", "banana"]);
        assert_eq!(entries[1].password, "3");

        assert!(matches!(
            service.save_password(" ", "x").await,
            Err(Error::Store(pwcheck_store::StoreError::Validation(_)))
        ));
    }
}
