//! Catalog synchronization for game-reference data.
//!
//! Pulls augments, champions, and items from CommunityDragon / Data Dragon,
//! normalizes them onto one canonical record shape, reconciles them against
//! persisted records, and repairs stale icon URLs with bounded-concurrency
//! probing. See the `jobs` module for the per-domain entry points and
//! `scheduler` for the single-flight periodic driver.

pub mod catalog;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod normalize;
pub mod probe;
pub mod reconcile;
pub mod scheduler;
pub mod sources;
pub mod store;
pub mod writer;

pub mod util {
    pub mod env;
    pub mod json;
    pub mod json_cache;
}
