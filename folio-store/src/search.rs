//! Search index notification seam.
//!
//! Indexing is fire-and-forget: the store notifies the indexer after a
//! write commits, logs failures, and never rolls back content on an
//! indexing error.

use folio_core::{FolioResult, Topic};

/// Receives topic state after committed writes.
pub trait SearchIndexer: Send + Sync {
    /// Index (or re-index) the current state of a topic.
    fn index_topic(&self, topic: &Topic) -> FolioResult<()>;

    /// Remove a topic from the index (soft delete).
    fn remove_topic(&self, topic: &Topic) -> FolioResult<()>;
}

/// The default indexer: does nothing.
#[derive(Debug, Default)]
pub struct NullSearchIndexer;

impl SearchIndexer for NullSearchIndexer {
    fn index_topic(&self, _topic: &Topic) -> FolioResult<()> {
        Ok(())
    }

    fn remove_topic(&self, _topic: &Topic) -> FolioResult<()> {
        Ok(())
    }
}
