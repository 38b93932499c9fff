use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;

use crate::error::Error;
use crate::hash::{is_sha1_hex, sha1_hex_upper};
use crate::provider::BreachProvider;

/// Curated subset of hashes from public breach dumps, one SHA-1 per line.
const GLOBAL_DATASET: &str = include_str!("../data/global_sha1.txt");

const GLOBAL_DATASET_NAME: &str = "Curated public breach dumps";

/// An offline breach dataset held in memory as a set of uppercase SHA-1 hex digests.
///
/// The set is immutable after construction, so lookups are a single hash plus a
/// `HashSet` probe.
#[derive(Debug, Clone)]
pub struct HashDataset {
    name: String,
    hashes: HashSet<String>,
}

impl HashDataset {
    /// Builds a dataset from SHA-1 hex digests.
    ///
    /// Entries are trimmed and uppercased; blank entries are skipped. Anything that is
    /// not a 40-character hex digest is rejected, as is a dataset with no entries.
    pub fn new<I, S>(name: &str, hashes: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("dataset name cannot be empty"));
        }

        let mut set = HashSet::new();
        for (index, entry) in hashes.into_iter().enumerate() {
            let trimmed = entry.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            if !is_sha1_hex(trimmed) {
                return Err(Error::validation(format!(
                    "invalid SHA-1 hash at index {index} in dataset '{name}'"
                )));
            }
            set.insert(trimmed.to_ascii_uppercase());
        }

        if set.is_empty() {
            return Err(Error::validation(format!(
                "dataset '{name}' must contain at least one hash entry"
            )));
        }

        Ok(Self { name: name.to_string(), hashes: set })
    }

    /// Builds a dataset from newline-separated hash text.
    pub fn from_lines(name: &str, text: &str) -> Result<Self, Error> {
        Self::new(name, text.split('\n'))
    }

    /// Loads a newline-separated hash list from disk.
    pub fn load(name: &str, path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_lines(name, &text)
    }

    /// The dataset compiled into the binary.
    pub fn global() -> Result<Self, Error> {
        Self::from_lines(GLOBAL_DATASET_NAME, GLOBAL_DATASET)
    }

    /// Checks whether the SHA-1 of `password` is in the dataset.
    pub fn contains_password(&self, password: &str) -> Result<bool, Error> {
        if password.is_empty() {
            return Err(Error::validation("password must not be empty"));
        }
        Ok(self.hashes.contains(&sha1_hex_upper(password)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[async_trait]
impl BreachProvider for HashDataset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_breached(&self, password: &str) -> Result<bool, Error> {
        self.contains_password(password)
    }
}
