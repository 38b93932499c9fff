use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Error, ProviderFailure};
use crate::provider::BreachProvider;

const AGGREGATOR_NAME: &str = "Aggregated Breach Providers";

/// Queries several breach providers in order.
///
/// Providers are consulted one at a time in the order given, and the first positive
/// answer wins without querying the rest, so cheap local datasets should come before
/// network clients. A negative answer is only returned when every provider answered.
pub struct BreachAggregator {
    providers: Vec<Arc<dyn BreachProvider>>,
}

impl BreachAggregator {
    /// Builds an aggregator from a provider list that may contain missing entries.
    ///
    /// Fails if the list is empty or any slot is `None`.
    pub fn new(providers: Vec<Option<Arc<dyn BreachProvider>>>) -> Result<Self, Error> {
        if providers.is_empty() {
            return Err(Error::validation("at least one breach provider is required"));
        }

        let providers = providers
            .into_iter()
            .enumerate()
            .map(|(index, provider)| {
                provider.ok_or_else(|| {
                    Error::validation(format!("breach provider at index {index} is missing"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { providers })
    }

    pub fn from_providers(providers: Vec<Arc<dyn BreachProvider>>) -> Result<Self, Error> {
        Self::new(providers.into_iter().map(Some).collect())
    }

    pub fn providers(&self) -> &[Arc<dyn BreachProvider>] {
        &self.providers
    }
}

#[async_trait]
impl BreachProvider for BreachAggregator {
    fn name(&self) -> &str {
        AGGREGATOR_NAME
    }

    async fn is_breached(&self, password: &str) -> Result<bool, Error> {
        if password.is_empty() {
            return Err(Error::validation("password must not be empty"));
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.is_breached(password).await {
                Ok(true) => {
                    debug!(provider = provider.name(), "breach confirmed");
                    return Ok(true);
                }
                Ok(false) => {}
                Err(source) => {
                    warn!(provider = provider.name(), error = %source, "breach provider failed");
                    failures
                        .push(ProviderFailure { provider: provider.name().to_string(), source });
                }
            }
        }

        if failures.is_empty() {
            Ok(false)
        } else if failures.len() == self.providers.len() {
            Err(Error::AllProvidersFailed { failures })
        } else {
            Err(Error::SomeProvidersFailed { failures })
        }
    }
}
