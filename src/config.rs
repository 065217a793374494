use crate::error::IngestError;
use std::env;
use std::fmt;

const DEFAULT_MAX_CONNECTIONS: usize = 16;

pub struct Config {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub neo4j_database: String,
    pub max_connections: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, IngestError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, IngestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let neo4j_uri = lookup("NEO4J_URI")
            .filter(|v| !v.trim().is_empty())
            .ok_or(IngestError::MissingEnv("NEO4J_URI"))?;

        let max_connections = match lookup("NEO4J_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    IngestError::InvalidConfiguration(format!(
                        "NEO4J_MAX_CONNECTIONS must be a positive integer, got {:?}",
                        raw
                    ))
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Config {
            neo4j_uri,
            neo4j_user: lookup("NEO4J_USERNAME")
                .or_else(|| lookup("NEO4J_USER"))
                .unwrap_or_else(|| "neo4j".to_string()),
            neo4j_password: lookup("NEO4J_PASSWORD").unwrap_or_default(),
            neo4j_database: lookup("NEO4J_DATABASE")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "neo4j".to_string()),
            max_connections,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("neo4j_uri", &self.neo4j_uri)
            .field("neo4j_user", &self.neo4j_user)
            .field("neo4j_password", &"***")
            .field("neo4j_database", &self.neo4j_database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_uri_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[("NEO4J_USERNAME", "neo4j")])).unwrap_err();
        assert!(matches!(err, IngestError::MissingEnv("NEO4J_URI")));

        let err = Config::from_lookup(lookup_from(&[("NEO4J_URI", "  ")])).unwrap_err();
        assert!(matches!(err, IngestError::MissingEnv("NEO4J_URI")));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("NEO4J_URI", "bolt://localhost:7687")])).unwrap();
        assert_eq!(config.neo4j_user, "neo4j");
        assert_eq!(config.neo4j_password, "");
        assert_eq!(config.neo4j_database, "neo4j");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_explicit_values_and_user_fallback() {
        let config = Config::from_lookup(lookup_from(&[
            ("NEO4J_URI", "neo4j+s://db.example"),
            ("NEO4J_USER", "loader"),
            ("NEO4J_PASSWORD", "secret"),
            ("NEO4J_DATABASE", "papers"),
            ("NEO4J_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.neo4j_user, "loader");
        assert_eq!(config.neo4j_database, "papers");
        assert_eq!(config.max_connections, 4);
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_invalid_pool_size() {
        let err = Config::from_lookup(lookup_from(&[
            ("NEO4J_URI", "bolt://localhost:7687"),
            ("NEO4J_MAX_CONNECTIONS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, IngestError::InvalidConfiguration(_)));
    }
}
