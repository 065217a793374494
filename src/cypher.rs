//! Write Operation Builder
//!
//! Produces parameterized Cypher write operations for each entity and
//! relationship kind. Values are always bound as parameters; only the shape
//! of the paper upsert varies, depending on the publication venue variant.

use crate::model::{into_object, AuthorRef, Paper, PropertyMap, PublicationVenue, Venue};
use serde_json::Value;

// ============================================================================
// Operation Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Paper,
    Author,
    Venue,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Paper, EntityKind::Author, EntityKind::Venue];

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Paper => "Paper",
            EntityKind::Author => "Author",
            EntityKind::Venue => "Venue",
        }
    }

    /// Identity property protected by the uniqueness constraint.
    pub fn key(&self) -> &'static str {
        match self {
            EntityKind::Paper => "paperId",
            EntityKind::Author => "authorId",
            EntityKind::Venue => "id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    UpsertPaper,
    UpsertAuthor,
    UpsertVenue,
    LinkPaperAuthor,
    LinkPaperVenue,
    Constraint(EntityKind),
}

impl WriteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteKind::UpsertPaper => "upsert_paper",
            WriteKind::UpsertAuthor => "upsert_author",
            WriteKind::UpsertVenue => "upsert_venue",
            WriteKind::LinkPaperAuthor => "link_paper_author",
            WriteKind::LinkPaperVenue => "link_paper_venue",
            WriteKind::Constraint(EntityKind::Paper) => "constraint_paper",
            WriteKind::Constraint(EntityKind::Author) => "constraint_author",
            WriteKind::Constraint(EntityKind::Venue) => "constraint_venue",
        }
    }
}

/// A Cypher statement plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSpec {
    pub kind: WriteKind,
    pub text: String,
    pub params: PropertyMap,
}

impl WriteSpec {
    fn new(kind: WriteKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            params: PropertyMap::new(),
        }
    }

    fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

// ============================================================================
// Node Upserts
// ============================================================================

const PAPER_PROPERTIES: &[&str] = &[
    "title",
    "externalIdMag",
    "externalIdDoi",
    "externalIdCorpus",
    "corpusId",
    "url",
    "venue",
    "year",
    "referenceCount",
    "citationCount",
    "abstract",
    "influentialCitationCount",
    "isOpenAccess",
    "openAccessPdfUrl",
    "openAccessPdfStatus",
    "fieldsOfStudy",
    "publicationTypes",
    "publicationDate",
    "bibtex",
];

const VENUE_PROPERTIES: &[&str] = &[
    "name",
    "url",
    "alternate_names",
    "issn",
    "alternate_issns",
    "alternate_urls",
    "type",
];

/// `var.prop = $var.prop` for every property; the map parameter shares the variable name.
fn set_clauses(var: &str, properties: &[&str]) -> String {
    properties
        .iter()
        .map(|prop| format!("{var}.{prop} = ${var}.{prop}"))
        .collect::<Vec<_>>()
        .join(",\n                 ")
}

/// Match-or-create a paper by `paperId`. Properties are only set on create.
pub fn upsert_paper(paper: &Paper) -> WriteSpec {
    let mut properties = PAPER_PROPERTIES.to_vec();
    if matches!(paper.publication_venue, PublicationVenue::Name(_)) {
        properties.push("publicationVenue");
    }

    let text = format!(
        "MERGE (paper:Paper {{paperId: $paper.paperId}})
         ON CREATE
             SET {}
         RETURN paper.paperId AS id",
        set_clauses("paper", &properties)
    );

    WriteSpec::new(WriteKind::UpsertPaper, text).param("paper", into_object(paper.to_params()))
}

pub fn upsert_author(author: &AuthorRef) -> WriteSpec {
    WriteSpec::new(
        WriteKind::UpsertAuthor,
        "MERGE (author:Author {authorId: $author.authorId})
         ON CREATE
             SET author.name = $author.name
         RETURN author.authorId AS id",
    )
    .param("author", into_object(author.to_params()))
}

pub fn upsert_venue(venue: &Venue) -> WriteSpec {
    let text = format!(
        "MERGE (venue:Venue {{id: $venue.id}})
         ON CREATE
             SET {}
         RETURN venue.id AS id",
        set_clauses("venue", VENUE_PROPERTIES)
    );

    WriteSpec::new(WriteKind::UpsertVenue, text).param("venue", into_object(venue.to_params()))
}

// ============================================================================
// Relationships
// ============================================================================

/// Both endpoints must already exist; otherwise the write matches nothing.
pub fn link_paper_author(paper_id: &str, author_id: &str) -> WriteSpec {
    WriteSpec::new(
        WriteKind::LinkPaperAuthor,
        "MATCH (paper:Paper {paperId: $paperId})
         MATCH (author:Author {authorId: $authorId})
         MERGE (author)-[:IS_AUTHOR]->(paper)
         RETURN paper.paperId AS id",
    )
    .param("paperId", paper_id)
    .param("authorId", author_id)
}

pub fn link_paper_venue(paper_id: &str, venue_id: &str) -> WriteSpec {
    WriteSpec::new(
        WriteKind::LinkPaperVenue,
        "MATCH (paper:Paper {paperId: $paperId})
         MATCH (venue:Venue {id: $venueId})
         MERGE (paper)-[:WAS_PUBLISHED]->(venue)
         RETURN paper.paperId AS id",
    )
    .param("paperId", paper_id)
    .param("venueId", venue_id)
}

// ============================================================================
// Schema
// ============================================================================

pub fn constraint_for(kind: EntityKind) -> WriteSpec {
    let text = format!(
        "CREATE CONSTRAINT unique_{} IF NOT EXISTS
         FOR (n:{}) REQUIRE n.{} IS UNIQUE",
        kind.label().to_lowercase(),
        kind.label(),
        kind.key()
    );
    WriteSpec::new(WriteKind::Constraint(kind), text)
}
