//! Seams to collaborators the codec does not own.
//!
//! The controller's HTTP layer, the Docker CLI and the node registry file
//! sit behind these traits; the codec crates only ever see the trait objects.

use crate::{NodeRecord, ServiceKey};

/// Keyed store of registered nodes.
pub trait NodeDirectory {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, id: &str) -> Result<Option<NodeRecord>, Self::Error>;
    fn list(&self) -> Result<Vec<NodeRecord>, Self::Error>;
    fn put(&self, id: &str, record: NodeRecord) -> Result<(), Self::Error>;
    /// Returns whether a record was removed.
    fn delete(&self, id: &str) -> Result<bool, Self::Error>;
}

/// Opaque container lifecycle control on a node.
pub trait ContainerControl {
    type Error: std::error::Error + Send + Sync + 'static;

    fn restart(&self, service: ServiceKey) -> Result<String, Self::Error>;
    fn inspect_status(&self, service: ServiceKey) -> String;
    fn tail_logs(&self, service: ServiceKey, lines: u32) -> Result<String, Self::Error>;
}

/// Transport that asks one node agent for its connection links.
///
/// `Links` is left generic so this crate does not depend on the link codec.
pub trait LinkSource {
    type Links;
    type Error: std::fmt::Display;

    fn fetch_links(&self, node: &NodeRecord) -> Result<Self::Links, Self::Error>;
}
