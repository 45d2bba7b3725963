//! Error type for the fallible parts of the API.
//!
//! Lookups that can simply come back empty return `Option` or a past-the-end cursor instead;
//! misuse such as stepping a cursor off either end panics.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// The key passed to [`SkipMap::at`](crate::SkipMap::at) or one of its relatives is absent.
    #[error("key not found")]
    KeyNotFound,

    /// A [`Config`](crate::Config) asked for more capacity than the node arena can address.
    #[error("requested capacity {requested} exceeds the maximum of {max}")]
    InvalidConfig { requested: usize, max: usize },
}
