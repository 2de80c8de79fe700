//! Shared handler state.

use std::sync::Arc;

use hearth_core::leveling::LevelCurve;
use hearth_core::store::SqliteUserStore;

use crate::schema::SchemaReconciler;

/// State cloned into every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// User progression reads.
    pub store: SqliteUserStore,
    /// Active threshold curve.
    pub curve: LevelCurve,
    /// Startup reconciliation guard; `/health` reports its outcome.
    pub reconciler: Arc<SchemaReconciler>,
}

impl AppState {
    /// Bundles the pieces the router needs.
    #[must_use]
    pub const fn new(
        store: SqliteUserStore,
        curve: LevelCurve,
        reconciler: Arc<SchemaReconciler>,
    ) -> Self {
        Self {
            store,
            curve,
            reconciler,
        }
    }
}
