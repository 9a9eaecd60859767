//! Canonical catalog record shape plus the derived keys and tier scale every
//! provider payload is normalized onto.

pub mod keys;
pub mod record;
pub mod tier;

pub use record::{CatalogRecord, Domain, ResourceRefs};
