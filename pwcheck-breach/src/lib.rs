//! Breached password checking for pwcheck.
//!
//! A password can be checked against several sources of breach data through the
//! [`BreachProvider`] trait:
//!
//! - [`HashDataset`]: an in-memory set of full SHA-1 hashes, either compiled into the
//!   binary ([`HashDataset::global`]) or loaded from an offline hash list.
//! - [`RemoteBreachClient`]: the Have I Been Pwned range API. Only the first 5 hex
//!   characters of the SHA-1 hash leave the machine (k-anonymity); the matching is done
//!   locally against the returned suffixes.
//! - [`BreachAggregator`]: queries a list of providers in order and stops at the first
//!   positive answer. A negative answer is only reported when every provider answered;
//!   if any of them failed the aggregator fails too, since "not breached" from
//!   incomplete evidence is a false negative.
//!
//! The aggregator is itself a provider, so aggregators can be nested.

pub mod aggregator;
pub mod client;
pub mod dataset;
pub mod error;
pub mod hash;
pub mod provider;

pub use aggregator::BreachAggregator;
pub use client::RemoteBreachClient;
pub use dataset::HashDataset;
pub use error::{Error, ProviderFailure};
pub use hash::{HASH_HEX_LEN, PREFIX_LEN, sha1_hex_upper, split_range_key};
pub use provider::BreachProvider;
