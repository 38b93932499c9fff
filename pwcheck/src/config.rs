use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::generator::{MAX_ENTROPY_BITS, MAX_PASSWORD_LENGTH};

pub const ENV_HIBP_BASE_URL: &str = "HIBP_BASE_URL";
pub const ENV_HIBP_HTTP_TIMEOUT: &str = "HIBP_HTTP_TIMEOUT";
pub const ENV_HIBP_USER_AGENT: &str = "HIBP_USER_AGENT";
pub const ENV_PASSWORD_MIN_LENGTH: &str = "PASSWORD_MIN_LENGTH";
pub const ENV_GENERATOR_MIN_LENGTH: &str = "GENERATOR_MIN_LENGTH";
pub const ENV_GENERATOR_BITS: &str = "GENERATOR_DEFAULT_BITS";
pub const ENV_CLI_MAX_RETRIES: &str = "CLI_MAX_PROMPT_RETRIES";
pub const ENV_STORAGE_PATH: &str = "PASSWORD_STORE_PATH";
pub const ENV_DATASET_PATH: &str = "PWCHECK_DATASET_PATH";
pub const ENV_OFFLINE: &str = "PWCHECK_OFFLINE";

const DEFAULT_HIBP_BASE_URL: &str = "https://api.pwnedpasswords.com/range";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_PASSWORD_MIN_LENGTH: usize = 12;
const DEFAULT_GENERATOR_MIN_LENGTH: usize = 16;
const DEFAULT_GENERATOR_BITS: u32 = 128;
// ~log2 of the generator charset size
const DEFAULT_BITS_PER_CHARACTER: f64 = 5.95;
const DEFAULT_CLI_MAX_RETRIES: u32 = 3;
const DEFAULT_SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?/";

/// Longest accepted `HIBP_HTTP_TIMEOUT`.
pub const MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Grace added on top of the HTTP timeout for the whole breach check.
pub const BREACH_DEADLINE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var} value '{value}': {reason}")]
    Invalid { var: &'static str, value: String, reason: &'static str },
}

/// Runtime configuration, read from environment variables with defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub password: PasswordConfig,
    pub generator: GeneratorConfig,
    pub breach: BreachConfig,
    pub cli: CliConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordConfig {
    pub min_length: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub min_length: usize,
    pub default_bits: u32,
    pub bits_per_character: f64,
    pub special_characters: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreachConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    /// Extra offline hash list checked before the remote API.
    pub dataset_path: Option<PathBuf>,
    /// Skip the remote API and rely on offline datasets only.
    pub offline: bool,
}

impl BreachConfig {
    /// Deadline for a complete breach check.
    pub fn deadline(&self) -> Duration {
        self.timeout.saturating_add(BREACH_DEADLINE_GRACE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub max_prompt_retries: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            password: PasswordConfig { min_length: DEFAULT_PASSWORD_MIN_LENGTH },
            generator: GeneratorConfig {
                min_length: DEFAULT_GENERATOR_MIN_LENGTH,
                default_bits: DEFAULT_GENERATOR_BITS,
                bits_per_character: DEFAULT_BITS_PER_CHARACTER,
                special_characters: DEFAULT_SPECIAL_CHARACTERS.to_string(),
            },
            breach: BreachConfig {
                base_url: DEFAULT_HIBP_BASE_URL.to_string(),
                timeout: DEFAULT_HTTP_TIMEOUT,
                user_agent: default_user_agent(),
                dataset_path: None,
                offline: false,
            },
            cli: CliConfig { max_prompt_retries: DEFAULT_CLI_MAX_RETRIES },
            storage: StorageConfig { path: default_storage_path() },
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its
    /// value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
        };
        let mut cfg = Self::default();

        if let Some(base_url) = get(ENV_HIBP_BASE_URL) {
            cfg.breach.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = get(ENV_HIBP_HTTP_TIMEOUT) {
            let timeout = parse_duration(&raw).ok_or_else(|| ConfigError::Invalid {
                var: ENV_HIBP_HTTP_TIMEOUT,
                value: raw.clone(),
                reason: "expected a positive duration such as 500ms, 5s or 1m",
            })?;
            if timeout > MAX_HTTP_TIMEOUT {
                return Err(ConfigError::Invalid {
                    var: ENV_HIBP_HTTP_TIMEOUT,
                    value: raw,
                    reason: "timeout cannot exceed 1 hour",
                });
            }
            cfg.breach.timeout = timeout;
        }
        if let Some(user_agent) = get(ENV_HIBP_USER_AGENT) {
            cfg.breach.user_agent = user_agent;
        }
        if let Some(raw) = get(ENV_PASSWORD_MIN_LENGTH) {
            cfg.password.min_length =
                parse_positive(ENV_PASSWORD_MIN_LENGTH, &raw, MAX_PASSWORD_LENGTH)?;
        }
        if let Some(raw) = get(ENV_GENERATOR_MIN_LENGTH) {
            cfg.generator.min_length =
                parse_positive(ENV_GENERATOR_MIN_LENGTH, &raw, MAX_PASSWORD_LENGTH)?;
        }
        if let Some(raw) = get(ENV_GENERATOR_BITS) {
            cfg.generator.default_bits =
                parse_positive(ENV_GENERATOR_BITS, &raw, MAX_ENTROPY_BITS)?;
        }
        if let Some(raw) = get(ENV_CLI_MAX_RETRIES) {
            cfg.cli.max_prompt_retries = parse_positive(ENV_CLI_MAX_RETRIES, &raw, u32::MAX)?;
        }
        if let Some(raw) = get(ENV_STORAGE_PATH) {
            cfg.storage.path = parse_path(ENV_STORAGE_PATH, &raw)?;
        }
        if let Some(raw) = get(ENV_DATASET_PATH) {
            cfg.breach.dataset_path = Some(parse_path(ENV_DATASET_PATH, &raw)?);
        }
        if let Some(raw) = get(ENV_OFFLINE) {
            cfg.breach.offline = parse_bool(&raw).ok_or(ConfigError::Invalid {
                var: ENV_OFFLINE,
                value: raw.clone(),
                reason: "expected true, false, 1 or 0",
            })?;
        }

        Ok(cfg)
    }
}

fn default_user_agent() -> String {
    format!("pwcheck/{}", env!("CARGO_PKG_VERSION"))
}

fn default_storage_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) if !home.as_os_str().is_empty() => {
            home.join(".password-checker").join("passwords.json")
        }
        _ => PathBuf::from("passwords.json"),
    }
}

fn parse_positive<T>(var: &'static str, raw: &str, max: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + From<u8>,
{
    let invalid = |reason| ConfigError::Invalid { var, value: raw.to_string(), reason };
    match raw.parse::<T>() {
        Ok(value) if value < T::from(1) => Err(invalid("expected an integer of at least 1")),
        Ok(value) if value > max => Err(invalid("value exceeds the supported maximum")),
        Ok(value) => Ok(value),
        Err(_) => Err(invalid("expected an integer of at least 1")),
    }
}

fn parse_path(var: &'static str, raw: &str) -> Result<PathBuf, ConfigError> {
    let path = Path::new(raw);
    if path.components().all(|component| component == Component::CurDir) {
        return Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "path must name a file",
        });
    }
    Ok(path.to_path_buf())
}

/// Parses `500ms`, `5s`, `2m` or a bare number of seconds. Zero is rejected.
fn parse_duration(raw: &str) -> Option<Duration> {
    let (digits, unit): (&str, fn(u64) -> Duration) = if let Some(n) = raw.strip_suffix("ms") {
        (n, Duration::from_millis)
    } else if let Some(n) = raw.strip_suffix('s') {
        (n, Duration::from_secs)
    } else if let Some(n) = raw.strip_suffix('m') {
        (n, |m| Duration::from_secs(m.saturating_mul(60)))
    } else {
        (raw, Duration::from_secs)
    };

    let duration = unit(digits.trim().parse::<u64>().ok()?);
    (!duration.is_zero()).then_some(duration)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
