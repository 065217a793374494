//! Paper / Author / Venue Entity Model
//!
//! Decodes one raw search-API record into immutable typed entities and
//! exposes the property maps bound as write parameters.

use crate::error::IngestError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Property name -> value map bound to a write operation.
pub type PropertyMap = BTreeMap<String, Value>;

// ============================================================================
// Typed Entities
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExternalIds {
    #[serde(rename = "MAG", default, deserialize_with = "lenient")]
    pub mag: Option<String>,
    #[serde(rename = "DOI", default, deserialize_with = "lenient")]
    pub doi: Option<String>,
    #[serde(rename = "CorpusId", default, deserialize_with = "lenient")]
    pub corpus_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OpenAccessPdf {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
}

/// Journal info is decoded but not written to the graph.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Journal {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub pages: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub volume: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct S2FieldOfStudy {
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<String>,
}

/// An author entry of a paper. Entries without an id are never written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorRef {
    pub author_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub alternate_names: Option<Vec<String>>,
    pub issn: Option<String>,
    pub alternate_issns: Option<Vec<String>>,
    pub alternate_urls: Option<Vec<String>>,
    pub kind: Option<String>,
}

/// Shape of `publicationVenue`, fixed at decode time.
#[derive(Debug, Clone, PartialEq)]
pub enum PublicationVenue {
    Absent,
    Name(String),
    Structured(Venue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paper {
    pub paper_id: String,
    pub external_ids: ExternalIds,
    pub corpus_id: Option<i64>,
    pub publication_venue: PublicationVenue,
    pub url: Option<String>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub venue: Option<String>,
    pub year: Option<i64>,
    pub reference_count: Option<i64>,
    pub citation_count: Option<i64>,
    pub influential_citation_count: Option<i64>,
    pub is_open_access: Option<bool>,
    pub open_access_pdf: OpenAccessPdf,
    pub fields_of_study: Option<Vec<String>>,
    pub s2_fields_of_study: Vec<S2FieldOfStudy>,
    pub publication_types: Option<Vec<String>>,
    pub publication_date: Option<String>,
    pub journal: Option<Journal>,
    pub bibtex: Option<String>,
    pub authors: Vec<AuthorRef>,
}

// ============================================================================
// Wire Format
// ============================================================================

/// Optional attributes decode to `None` when their JSON type is unexpected;
/// only identity fields can make a record malformed.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPaper {
    paper_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    external_ids: Option<ExternalIds>,
    #[serde(default, deserialize_with = "lenient")]
    corpus_id: Option<i64>,
    publication_venue: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(rename = "abstract", default, deserialize_with = "lenient")]
    abstract_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    venue: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    year: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    reference_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    citation_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    influential_citation_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    is_open_access: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    open_access_pdf: Option<OpenAccessPdf>,
    #[serde(default, deserialize_with = "lenient")]
    fields_of_study: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    s2_fields_of_study: Option<Vec<S2FieldOfStudy>>,
    #[serde(default, deserialize_with = "lenient")]
    publication_types: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    publication_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    journal: Option<Journal>,
    #[serde(default, deserialize_with = "lenient")]
    citation_styles: Option<RawCitationStyles>,
    #[serde(default, deserialize_with = "lenient")]
    authors: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawVenue {
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    alternate_names: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    issn: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    alternate_issns: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    alternate_urls: Option<Vec<String>>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuthor {
    #[serde(default, deserialize_with = "lenient")]
    author_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCitationStyles {
    #[serde(default, deserialize_with = "lenient")]
    bibtex: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Decoding
// ============================================================================

impl Paper {
    /// Decode the raw record at position `index` of its source.
    pub fn from_value(index: usize, value: Value) -> Result<Self, IngestError> {
        let raw: RawPaper = serde_json::from_value(value)
            .map_err(|e| IngestError::malformed(index, e.to_string()))?;

        let paper_id = non_empty(raw.paper_id)
            .ok_or_else(|| IngestError::malformed(index, "missing paperId"))?;

        let publication_venue = decode_venue(index, &paper_id, raw.publication_venue)?;

        // Entries that are not objects count as authors without an id.
        let authors = raw
            .authors
            .unwrap_or_default()
            .into_iter()
            .map(|entry| match serde_json::from_value::<RawAuthor>(entry) {
                Ok(author) => AuthorRef {
                    author_id: non_empty(author.author_id),
                    name: author.name,
                },
                Err(_) => AuthorRef::default(),
            })
            .collect();

        Ok(Paper {
            paper_id,
            external_ids: raw.external_ids.unwrap_or_default(),
            corpus_id: raw.corpus_id,
            publication_venue,
            url: raw.url,
            title: raw.title,
            abstract_text: raw.abstract_text,
            venue: raw.venue,
            year: raw.year,
            reference_count: raw.reference_count,
            citation_count: raw.citation_count,
            influential_citation_count: raw.influential_citation_count,
            is_open_access: raw.is_open_access,
            open_access_pdf: raw.open_access_pdf.unwrap_or_default(),
            fields_of_study: raw.fields_of_study,
            s2_fields_of_study: raw.s2_fields_of_study.unwrap_or_default(),
            publication_types: raw.publication_types,
            publication_date: raw.publication_date,
            journal: raw.journal,
            bibtex: raw.citation_styles.and_then(|c| c.bibtex),
            authors,
        })
    }

    pub fn structured_venue(&self) -> Option<&Venue> {
        match &self.publication_venue {
            PublicationVenue::Structured(venue) => Some(venue),
            _ => None,
        }
    }

    /// Authors that will be written, in list order.
    pub fn writable_authors(&self) -> impl Iterator<Item = (&str, &AuthorRef)> {
        self.authors
            .iter()
            .filter_map(|a| a.author_id.as_deref().map(|id| (id, a)))
    }

    pub fn to_params(&self) -> PropertyMap {
        let mut m = PropertyMap::new();
        m.insert("paperId".to_string(), self.paper_id.clone().into());
        m.insert("title".to_string(), self.title.clone().into());
        m.insert("externalIdMag".to_string(), self.external_ids.mag.clone().into());
        m.insert("externalIdDoi".to_string(), self.external_ids.doi.clone().into());
        m.insert("externalIdCorpus".to_string(), self.external_ids.corpus_id.into());
        m.insert("corpusId".to_string(), self.corpus_id.into());
        m.insert("url".to_string(), self.url.clone().into());
        m.insert("venue".to_string(), self.venue.clone().into());
        m.insert("year".to_string(), self.year.into());
        m.insert("referenceCount".to_string(), self.reference_count.into());
        m.insert("citationCount".to_string(), self.citation_count.into());
        m.insert("abstract".to_string(), self.abstract_text.clone().into());
        m.insert(
            "influentialCitationCount".to_string(),
            self.influential_citation_count.into(),
        );
        m.insert("isOpenAccess".to_string(), self.is_open_access.into());
        m.insert("openAccessPdfUrl".to_string(), self.open_access_pdf.url.clone().into());
        m.insert(
            "openAccessPdfStatus".to_string(),
            self.open_access_pdf.status.clone().into(),
        );
        m.insert("fieldsOfStudy".to_string(), self.fields_of_study.clone().into());
        m.insert("publicationTypes".to_string(), self.publication_types.clone().into());
        m.insert("publicationDate".to_string(), self.publication_date.clone().into());
        m.insert("bibtex".to_string(), self.bibtex.clone().into());

        if let PublicationVenue::Name(name) = &self.publication_venue {
            m.insert("publicationVenue".to_string(), name.clone().into());
        }
        m
    }
}

/// A string is a venue name and an object a structured venue, which must
/// carry an `id`. Any other shape is treated as absent.
fn decode_venue(
    index: usize,
    paper_id: &str,
    value: Option<Value>,
) -> Result<PublicationVenue, IngestError> {
    let venue = match value {
        Some(Value::String(name)) => return Ok(PublicationVenue::Name(name)),
        Some(value @ Value::Object(_)) => serde_json::from_value::<RawVenue>(value).map_err(|e| {
            IngestError::malformed(index, format!("publicationVenue of paper {}: {}", paper_id, e))
        })?,
        _ => return Ok(PublicationVenue::Absent),
    };

    let id = non_empty(venue.id).ok_or_else(|| {
        IngestError::malformed(index, format!("publicationVenue of paper {} has no id", paper_id))
    })?;

    Ok(PublicationVenue::Structured(Venue {
        id,
        name: venue.name,
        url: venue.url,
        alternate_names: venue.alternate_names,
        issn: venue.issn,
        alternate_issns: venue.alternate_issns,
        alternate_urls: venue.alternate_urls,
        kind: venue.kind,
    }))
}

impl AuthorRef {
    pub fn to_params(&self) -> PropertyMap {
        let mut m = PropertyMap::new();
        m.insert("authorId".to_string(), self.author_id.clone().into());
        m.insert("name".to_string(), self.name.clone().into());
        m
    }
}

impl Venue {
    pub fn to_params(&self) -> PropertyMap {
        let mut m = PropertyMap::new();
        m.insert("id".to_string(), self.id.clone().into());
        m.insert("name".to_string(), self.name.clone().into());
        m.insert("url".to_string(), self.url.clone().into());
        m.insert("alternate_names".to_string(), self.alternate_names.clone().into());
        m.insert("issn".to_string(), self.issn.clone().into());
        m.insert("alternate_issns".to_string(), self.alternate_issns.clone().into());
        m.insert("alternate_urls".to_string(), self.alternate_urls.clone().into());
        m.insert("type".to_string(), self.kind.clone().into());
        m
    }
}

/// Wrap a property map so it can be bound as a single map parameter.
pub fn into_object(map: PropertyMap) -> Value {
    Value::Object(map.into_iter().collect::<Map<String, Value>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_record() -> Value {
        json!({
            "paperId": "P1",
            "externalIds": {"MAG": "123", "DOI": "10.1/x", "CorpusId": 42},
            "corpusId": 42,
            "publicationVenue": {
                "id": "V1",
                "name": "Conf",
                "type": "conference",
                "alternate_names": ["C"],
                "url": "https://conf.example"
            },
            "url": "https://example.org/p1",
            "title": "A Paper",
            "abstract": null,
            "venue": "Conf",
            "year": 2020,
            "referenceCount": 10,
            "citationCount": 5,
            "influentialCitationCount": 1,
            "isOpenAccess": true,
            "openAccessPdf": {"url": "https://example.org/p1.pdf", "status": "GREEN"},
            "fieldsOfStudy": ["Computer Science"],
            "s2FieldsOfStudy": [{"category": "Computer Science", "source": "external"}],
            "publicationTypes": ["JournalArticle"],
            "publicationDate": "2020-01-01",
            "journal": {"name": "J", "pages": "1-2", "volume": "3"},
            "citationStyles": {"bibtex": "@article{p1}"},
            "authors": [
                {"authorId": "A1", "name": "X"},
                {"authorId": null, "name": "Nobody"},
                null
            ]
        })
    }

    #[test]
    fn test_decode_full_record() {
        let paper = Paper::from_value(0, full_record()).expect("record should decode");

        assert_eq!(paper.paper_id, "P1");
        assert_eq!(paper.external_ids.mag.as_deref(), Some("123"));
        assert_eq!(paper.external_ids.corpus_id, Some(42));
        assert_eq!(paper.year, Some(2020));
        assert_eq!(paper.bibtex.as_deref(), Some("@article{p1}"));
        assert_eq!(paper.journal.as_ref().and_then(|j| j.volume.as_deref()), Some("3"));
        assert_eq!(paper.authors.len(), 3);

        let venue = paper.structured_venue().expect("structured venue");
        assert_eq!(venue.id, "V1");
        assert_eq!(venue.kind.as_deref(), Some("conference"));
    }

    #[test]
    fn test_only_authors_with_id_are_writable() {
        let paper = Paper::from_value(0, full_record()).unwrap();
        let ids: Vec<&str> = paper.writable_authors().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["A1"]);
    }

    #[test]
    fn test_publication_venue_variants() {
        let absent = Paper::from_value(0, json!({"paperId": "P1"})).unwrap();
        assert_eq!(absent.publication_venue, PublicationVenue::Absent);

        let null = Paper::from_value(0, json!({"paperId": "P1", "publicationVenue": null})).unwrap();
        assert_eq!(null.publication_venue, PublicationVenue::Absent);

        let named = Paper::from_value(0, json!({"paperId": "P1", "publicationVenue": "Nature"})).unwrap();
        assert_eq!(named.publication_venue, PublicationVenue::Name("Nature".to_string()));
        assert!(named.structured_venue().is_none());
    }

    #[test]
    fn test_missing_paper_id_is_malformed() {
        let err = Paper::from_value(7, json!({"title": "No id"})).unwrap_err();
        match err {
            IngestError::MalformedRecord { index, reason } => {
                assert_eq!(index, 7);
                assert!(reason.contains("paperId"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_venue_without_id_is_malformed() {
        let err = Paper::from_value(
            0,
            json!({"paperId": "P1", "publicationVenue": {"name": "Conf"}}),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord { .. }));
    }

    #[test]
    fn test_mistyped_optional_fields_decode_as_absent() {
        let paper = Paper::from_value(0, json!({"paperId": "P1", "year": "2020"}))
            .expect("wrong type on an optional field keeps the record");
        assert_eq!(paper.paper_id, "P1");
        assert_eq!(paper.year, None);

        let paper = Paper::from_value(
            0,
            json!({
                "paperId": "P2",
                "title": "Kept",
                "externalIds": {"CorpusId": "42", "DOI": "10.1/y"},
                "publicationTypes": "JournalArticle",
                "openAccessPdf": "n/a",
                "authors": [{"authorId": 123, "name": "X"}, "junk", {"authorId": "A2"}]
            }),
        )
        .expect("record should decode");

        assert_eq!(paper.title.as_deref(), Some("Kept"));
        assert_eq!(paper.external_ids.corpus_id, None);
        assert_eq!(paper.external_ids.doi.as_deref(), Some("10.1/y"));
        assert_eq!(paper.publication_types, None);
        assert_eq!(paper.open_access_pdf, OpenAccessPdf::default());
        assert_eq!(paper.authors.len(), 3);
        assert_eq!(paper.authors[0].name.as_deref(), Some("X"));
        let ids: Vec<&str> = paper.writable_authors().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["A2"]);
    }

    #[test]
    fn test_structured_venue_id_stays_strict() {
        let err = Paper::from_value(
            0,
            json!({"paperId": "P1", "publicationVenue": {"id": 7, "name": "Conf"}}),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord { .. }));

        let paper = Paper::from_value(
            0,
            json!({"paperId": "P1", "publicationVenue": {"id": "V1", "issn": 1234}}),
        )
        .unwrap();
        let venue = paper.structured_venue().expect("structured venue");
        assert_eq!(venue.id, "V1");
        assert_eq!(venue.issn, None);

        let odd = Paper::from_value(0, json!({"paperId": "P1", "publicationVenue": 5})).unwrap();
        assert_eq!(odd.publication_venue, PublicationVenue::Absent);
    }

    #[test]
    fn test_non_string_paper_id_is_malformed() {
        let err = Paper::from_value(3, json!({"paperId": 99})).unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord { index: 3, .. }));
    }

    #[test]
    fn test_paper_params_only_carry_string_venue() {
        let structured = Paper::from_value(0, full_record()).unwrap().to_params();
        assert!(!structured.contains_key("publicationVenue"));
        assert_eq!(structured.get("externalIdDoi"), Some(&json!("10.1/x")));
        assert_eq!(structured.get("openAccessPdfStatus"), Some(&json!("GREEN")));
        assert_eq!(structured.get("abstract"), Some(&Value::Null));
        assert!(!structured.contains_key("journal"));

        let named = Paper::from_value(0, json!({"paperId": "P2", "publicationVenue": "Nature"}))
            .unwrap()
            .to_params();
        assert_eq!(named.get("publicationVenue"), Some(&json!("Nature")));
    }

    #[test]
    fn test_venue_params_use_source_keys() {
        let paper = Paper::from_value(0, full_record()).unwrap();
        let params = paper.structured_venue().unwrap().to_params();
        assert_eq!(params.get("id"), Some(&json!("V1")));
        assert_eq!(params.get("type"), Some(&json!("conference")));
        assert_eq!(params.get("alternate_names"), Some(&json!(["C"])));
        assert_eq!(params.get("issn"), Some(&Value::Null));
    }
}
