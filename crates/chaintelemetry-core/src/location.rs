//! Seam for IP geolocation enrichment.

use async_trait::async_trait;

use crate::error::LookupError;
use crate::node::Location;

/// Resolves a node's IP address to a location.
///
/// Implementations are expected to cache results; the client calls
/// `lookup` once per `AddedNode` that carries an IP, off the event path.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn LocationProvider>`.
#[async_trait]
pub trait LocationProvider: Send + Sync + 'static {
    async fn lookup(&self, ip: &str) -> Result<Location, LookupError>;
}
