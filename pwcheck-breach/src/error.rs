use std::fmt;

/// A failure reported by one provider while the aggregator was consulting it.
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub source: Error,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.source)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("breach API request failed: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    #[error("breach API rate limit exceeded: {status}")]
    RateLimited { status: String },

    #[error("unexpected breach API response: {status}")]
    UnexpectedResponse { status: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("all breach providers failed: {}", join_failures(.failures))]
    AllProvidersFailed { failures: Vec<ProviderFailure> },

    #[error("some breach providers failed: {}", join_failures(.failures))]
    SomeProvidersFailed { failures: Vec<ProviderFailure> },
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// The per-provider failures for aggregate errors, empty otherwise.
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            Error::AllProvidersFailed { failures } | Error::SomeProvidersFailed { failures } => {
                failures
            }
            _ => &[],
        }
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
