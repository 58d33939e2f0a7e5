use async_trait::async_trait;
use mineral_core::{MineralError, OracleConfig, Result, Term};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// One solution of a SELECT query: variable name (without `?`) to bound term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    bindings: HashMap<String, Term>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, variable: impl Into<String>, term: Term) -> Self {
        self.bindings.insert(variable.into(), term);
        self
    }

    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.bindings.get(variable)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Executes a fully built query and returns its solutions in order.
///
/// An empty result is a normal answer, not an error; errors mean the query could not be run
/// or its result could not be read.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn select(&self, query: &str) -> Result<Vec<ResultRow>>;
}

/// Oracle backed by a SPARQL 1.1 protocol endpoint.
pub struct SparqlHttpOracle {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl SparqlHttpOracle {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MineralError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| MineralError::Config("No endpoint specified".to_string()))?;
        Self::new(endpoint, Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SparqlHttpOracle {
    /// One round trip: send the query and read the whole response body.
    async fn fetch(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/sparql-query")
            .header(ACCEPT, "application/sparql-results+json")
            .body(query.to_string())
            .send()
            .await
            .map_err(|e| self.request_error("SPARQL request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MineralError::Oracle(format!(
                "endpoint returned {}: {}",
                status, error_text
            )));
        }

        response
            .text()
            .await
            .map_err(|e| self.request_error("Failed to read SPARQL response", e))
    }

    fn request_error(&self, context: &str, e: reqwest::Error) -> MineralError {
        if e.is_timeout() {
            self.timeout_error()
        } else {
            MineralError::Network(format!("{}: {}", context, e))
        }
    }

    fn timeout_error(&self) -> MineralError {
        MineralError::Timeout(format!(
            "SPARQL request to {} timed out after {:?}",
            self.endpoint, self.timeout
        ))
    }
}

#[async_trait]
impl Oracle for SparqlHttpOracle {
    async fn select(&self, query: &str) -> Result<Vec<ResultRow>> {
        debug!("Sending query to {}", self.endpoint);

        // The deadline covers the body as well as the response head.
        let body = timeout(self.timeout, self.fetch(query))
            .await
            .map_err(|_| self.timeout_error())??;

        parse_results_json(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<HashMap<String, JsonTerm>>,
}

#[derive(Debug, Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(default)]
    datatype: Option<String>,
    #[serde(default, rename = "xml:lang")]
    lang: Option<String>,
}

impl JsonTerm {
    fn into_term(self) -> Result<Term> {
        match self.kind.as_str() {
            "uri" => Ok(Term::iri(self.value)),
            "bnode" => Ok(Term::blank(self.value)),
            "literal" | "typed-literal" => Ok(match (self.lang, self.datatype) {
                (Some(lang), _) => Term::lang(self.value, lang),
                (None, Some(datatype)) => Term::typed(self.value, datatype),
                (None, None) => Term::string(self.value),
            }),
            other => Err(MineralError::Parse(format!("unknown RDF term type '{}'", other))),
        }
    }
}

/// Parse a `application/sparql-results+json` document into rows.
pub fn parse_results_json(body: &str) -> Result<Vec<ResultRow>> {
    let results: SparqlResults = serde_json::from_str(body)
        .map_err(|e| MineralError::Parse(format!("Malformed SPARQL result set: {}", e)))?;

    results
        .results
        .bindings
        .into_iter()
        .map(|solution| -> Result<ResultRow> {
            let mut row = ResultRow::new();
            for (variable, term) in solution {
                row = row.with(variable, term.into_term()?);
            }
            Ok(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mineral_core::XSD_INTEGER;

    #[test]
    fn test_parse_select_results() {
        let body = r#"{
            "head": { "vars": ["result"] },
            "results": { "bindings": [
                { "result": { "type": "literal", "datatype": "http://www.w3.org/2001/XMLSchema#integer", "value": "2" } },
                { "result": { "type": "uri", "value": "http://ex.org/a" } },
                { "result": { "type": "literal", "xml:lang": "en", "value": "two" } },
                { "result": { "type": "bnode", "value": "b0" } },
                { }
            ] }
        }"#;

        let rows = parse_results_json(body).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].get("result"), Some(&Term::typed("2", XSD_INTEGER)));
        assert_eq!(rows[1].get("result"), Some(&Term::iri("http://ex.org/a")));
        assert_eq!(rows[2].get("result"), Some(&Term::lang("two", "en")));
        assert_eq!(rows[3].get("result"), Some(&Term::blank("b0")));
        assert!(rows[4].is_empty());
    }

    #[test]
    fn test_parse_empty_results() {
        let body = r#"{ "head": { "vars": ["result"] }, "results": { "bindings": [] } }"#;
        assert!(parse_results_json(body).unwrap().is_empty());
    }

    #[test]
    fn test_ask_response_is_malformed() {
        let body = r#"{ "head": {}, "boolean": true }"#;
        assert!(matches!(
            parse_results_json(body),
            Err(MineralError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_term_type() {
        let body = r#"{ "results": { "bindings": [ { "result": { "type": "triple", "value": "x" } } ] } }"#;
        assert!(parse_results_json(body).is_err());
    }

    #[test]
    fn test_from_config_requires_endpoint() {
        let config = OracleConfig::default();
        assert!(matches!(
            SparqlHttpOracle::from_config(&config),
            Err(MineralError::Config(_))
        ));
    }
}
