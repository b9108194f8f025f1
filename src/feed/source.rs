//! Opportunity source trait

use async_trait::async_trait;
use crate::types::Opportunity;

/// Injected feed of candidate trades. The engine does not care how prices
/// are obtained; real price integration lives behind this boundary.
#[async_trait]
pub trait OpportunitySource: Send + Sync {
    /// Yields the next candidate, or None when the feed is paused or idle.
    async fn next(&self) -> Option<Opportunity>;

    /// Stops producing candidates until resumed. Used by emergency stop.
    async fn pause(&self);

    async fn resume(&self);

    async fn is_paused(&self) -> bool;
}
