//! Neo4j Session Storage
//!
//! The loader only needs a narrow capability from the database: open a
//! session and run one write operation returning at most a single result.
//! `GraphStore` / `GraphSession` express that seam; `Neo4jStore` implements
//! it on top of the neo4rs connection pool.

use crate::config::Config;
use crate::cypher::WriteSpec;
use crate::error::IngestError;
use anyhow::Result;
use async_trait::async_trait;
use neo4rs::{query, BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph, Query};
use serde_json::Value;
use tracing::{debug, error, info, warn};

// ============================================================================
// Session Capability
// ============================================================================

/// Shared, read-only handle to the database (the connection pool).
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Acquire a session. Each concurrent record load owns its own session.
    async fn session(&self) -> Result<Box<dyn GraphSession>, IngestError>;
}

#[async_trait]
pub trait GraphSession: Send {
    /// Run one write operation in its own transaction and return the `id`
    /// column of the first row, if any.
    async fn run_write(&mut self, spec: &WriteSpec) -> Result<Option<String>, IngestError>;

    /// Release the session. Dropping a session releases it as well.
    async fn close(&mut self);
}

// ============================================================================
// Helper: Convert JSON parameters to BoltType
// ============================================================================

pub(crate) fn to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => BoltType::from(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => {
            let mut list = BoltList::new();
            for item in items {
                list.push(to_bolt(item));
            }
            BoltType::List(list)
        }
        Value::Object(map) => {
            let mut m = BoltMap::new();
            for (key, item) in map {
                m.put(BoltString::from(key.as_str()), to_bolt(item));
            }
            BoltType::Map(m)
        }
    }
}

fn to_query(spec: &WriteSpec) -> Query {
    spec.params
        .iter()
        .fold(query(&spec.text), |q, (key, value)| q.param(key, to_bolt(value)))
}

// ============================================================================
// Neo4j Implementation
// ============================================================================

pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn session(&self) -> Result<Box<dyn GraphSession>, IngestError> {
        // Graph is a cheap handle onto the shared pool.
        Ok(Box::new(Neo4jSession {
            graph: self.graph.clone(),
        }))
    }
}

pub struct Neo4jSession {
    graph: Graph,
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn run_write(&mut self, spec: &WriteSpec) -> Result<Option<String>, IngestError> {
        let operation = spec.kind.as_str();

        // Auto-commit: every operation is its own write transaction.
        let mut stream = self
            .graph
            .execute(to_query(spec))
            .await
            .map_err(|e| IngestError::write(operation, e))?;

        let first = stream
            .next()
            .await
            .map_err(|e| IngestError::write(operation, e))?;
        let id = first.and_then(|row| row.get::<String>("id").ok());

        while stream
            .next()
            .await
            .map_err(|e| IngestError::write(operation, e))?
            .is_some()
        {}

        debug!("   {} -> {:?}", operation, id);
        Ok(id)
    }

    async fn close(&mut self) {}
}

/// Connect to Neo4j with exponential backoff retry logic
pub async fn connect_with_retry(config: &Config, max_retries: u32) -> Result<Neo4jStore> {
    use tokio::time::{sleep, Duration};

    for attempt in 1..=max_retries {
        info!(
            "🔄 Attempting to connect to Neo4j at {}... (attempt {}/{})",
            config.neo4j_uri, attempt, max_retries
        );

        let neo4j_config = ConfigBuilder::default()
            .uri(config.neo4j_uri.as_str())
            .user(config.neo4j_user.as_str())
            .password(config.neo4j_password.as_str())
            .db(config.neo4j_database.as_str())
            .max_connections(config.max_connections)
            .build()?;

        match Graph::connect(neo4j_config).await {
            Ok(graph) => {
                info!("✅ Successfully connected to Neo4j (database={})", config.neo4j_database);
                return Ok(Neo4jStore::new(graph));
            }
            Err(e) => {
                if attempt < max_retries {
                    let wait_time = backoff_secs(attempt);
                    warn!(
                        "⚠️  Failed to connect to Neo4j: {}. Retrying in {}s (attempt {}/{})...",
                        e, wait_time, attempt, max_retries
                    );
                    sleep(Duration::from_secs(wait_time)).await;
                } else {
                    error!("❌ Failed to connect to Neo4j after {} attempts: {}", max_retries, e);
                    return Err(anyhow::anyhow!(
                        "Neo4j connection failed after {} retries: {}",
                        max_retries,
                        e
                    ));
                }
            }
        }
    }

    Err(anyhow::anyhow!("Failed to connect to Neo4j"))
}

/// 1s, 2s, 4s, 8s ...
pub(crate) fn backoff_secs(attempt: u32) -> u64 {
    2u64.pow(attempt.saturating_sub(1))
}
