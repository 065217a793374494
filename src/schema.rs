//! Uniqueness constraints for Paper, Author and Venue.

use crate::cypher::{constraint_for, EntityKind};
use crate::error::IngestError;
use crate::graph_store::GraphStore;
use tracing::info;

/// Create the three uniqueness constraints (no-op when they already exist).
/// Must complete before any entity is written.
pub async fn ensure_constraints(store: &dyn GraphStore) -> Result<(), IngestError> {
    let mut session = store.session().await?;

    let mut result = Ok(());
    for kind in EntityKind::ALL {
        if let Err(e) = session.run_write(&constraint_for(kind)).await {
            result = Err(e);
            break;
        }
        info!("   Ensured uniqueness constraint on {}.{}", kind.label(), kind.key());
    }

    session.close().await;
    result
}
