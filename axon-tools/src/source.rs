//! Dynamic tool provisioning.
//!
//! A `ToolSource` backs executors whose tool inventory can change while a
//! run is in flight (e.g. tools exposed by an external server). The
//! executor polls the source on a step interval and rebuilds its registry.

use crate::traits::Tool;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of dynamically provisioned tools.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Current tool inventory.
    ///
    /// An empty inventory means the source has shut down; an executor
    /// refreshing from it ends its run.
    async fn list_tools(&self) -> anyhow::Result<Vec<Arc<dyn Tool>>>;
}
