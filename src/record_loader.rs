//! Record Loader
//!
//! Writes one paper and its venue and authors through a single session.
//! Every operation is its own write transaction, so a partially written
//! paper (e.g. node created, one author link failed) is kept as is.

use crate::cypher::{link_paper_author, link_paper_venue, upsert_author, upsert_paper, upsert_venue};
use crate::error::IngestError;
use crate::graph_store::{GraphSession, GraphStore};
use crate::model::Paper;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStage {
    Start,
    PaperUpserted,
    VenueResolved,
    AuthorsLinked,
    Done,
    Failed,
}

/// Terminal result of loading one paper.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub paper_id: String,
    /// `Done` or `Failed`.
    pub stage: RecordStage,
    /// Last stage completed before the record terminated.
    pub reached: RecordStage,
    pub venue_linked: bool,
    pub authors_linked: usize,
    pub authors_skipped: usize,
    pub result: Result<(), String>,
}

impl RecordOutcome {
    fn new(paper_id: &str) -> Self {
        Self {
            paper_id: paper_id.to_string(),
            stage: RecordStage::Start,
            reached: RecordStage::Start,
            venue_linked: false,
            authors_linked: 0,
            authors_skipped: 0,
            result: Ok(()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    fn fail(mut self, err: IngestError) -> Self {
        error!("❌ {} (after {:?}): {}", self.paper_id, self.reached, err);
        self.stage = RecordStage::Failed;
        self.result = Err(err.to_string());
        self
    }
}

/// Load one paper. Never fails: errors end up in the returned outcome and
/// never reach sibling loads.
pub async fn load_record(store: &dyn GraphStore, paper: &Paper) -> RecordOutcome {
    let mut outcome = RecordOutcome::new(&paper.paper_id);

    let mut session = match store.session().await {
        Ok(session) => session,
        Err(e) => return outcome.fail(e),
    };

    let result = run_stages(session.as_mut(), paper, &mut outcome).await;
    session.close().await;

    match result {
        Ok(()) => {
            outcome.stage = RecordStage::Done;
            outcome.reached = RecordStage::Done;
            debug!(
                "   {} {:?}: venue_linked={}, authors linked={}, skipped={}",
                outcome.paper_id,
                outcome.stage,
                outcome.venue_linked,
                outcome.authors_linked,
                outcome.authors_skipped
            );
            outcome
        }
        Err(e) => outcome.fail(e),
    }
}

async fn run_stages(
    session: &mut dyn GraphSession,
    paper: &Paper,
    outcome: &mut RecordOutcome,
) -> Result<(), IngestError> {
    // Start -> PaperUpserted
    session.run_write(&upsert_paper(paper)).await?;
    outcome.reached = RecordStage::PaperUpserted;

    // PaperUpserted -> VenueResolved
    if let Some(venue) = paper.structured_venue() {
        session.run_write(&upsert_venue(venue)).await?;
        let linked = session
            .run_write(&link_paper_venue(&paper.paper_id, &venue.id))
            .await?;
        outcome.venue_linked = linked.is_some();
        if linked.is_none() {
            debug!("   {} -> venue {} matched nothing", paper.paper_id, venue.id);
        }
    }
    outcome.reached = RecordStage::VenueResolved;

    // VenueResolved -> AuthorsLinked; one failing author does not stop the rest
    outcome.authors_skipped = paper.authors.len() - paper.writable_authors().count();
    let mut first_error = None;
    for (author_id, author) in paper.writable_authors() {
        let linked = match session.run_write(&upsert_author(author)).await {
            Ok(_) => {
                session
                    .run_write(&link_paper_author(&paper.paper_id, author_id))
                    .await
            }
            Err(e) => Err(e),
        };

        match linked {
            Ok(Some(_)) => outcome.authors_linked += 1,
            Ok(None) => debug!("   {} -> author {} matched nothing", paper.paper_id, author_id),
            Err(e) => {
                warn!("⚠️  {}: author {} failed: {}", paper.paper_id, author_id, e);
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    outcome.reached = RecordStage::AuthorsLinked;
    Ok(())
}
