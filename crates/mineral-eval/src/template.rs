use mineral_core::{MineralError, Result, Term};
use std::path::Path;
use tracing::{debug, error};

pub const SNIPPET_PLACEHOLDER: &str = "%query_snippet%";
pub const BINDINGS_PLACEHOLDER: &str = "%bindings%";

/// SPARQL text with a slot for the recursive expression and one for the argument bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    text: String,
}

impl QueryTemplate {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        for placeholder in [SNIPPET_PLACEHOLDER, BINDINGS_PLACEHOLDER] {
            if !text.contains(placeholder) {
                return Err(MineralError::Template(format!(
                    "template has no {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self { text })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            error!("Error while reading sparql template {}: {}", path.display(), e);
            MineralError::Template(format!("cannot read {}: {}", path.display(), e))
        })?;
        let template = Self::new(content.lines().collect::<Vec<_>>().join("\n"))?;
        debug!("Loaded template from {}", path.display());
        Ok(template)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Render the query for a full argument tuple (snippet first).
    pub fn build(&self, args: &[Term]) -> Result<String> {
        let snippet = args.first().ok_or_else(|| {
            MineralError::Usage("a query snippet is required to build a query".to_string())
        })?;

        Ok(self
            .text
            .replace(SNIPPET_PLACEHOLDER, &snippet_text(snippet))
            .replace(BINDINGS_PLACEHOLDER, &bindings_clause(args)))
    }
}

/// Text spliced in for the snippet: the lexical form of a plain literal, otherwise the
/// rendered term with one pair of surrounding double quotes removed.
pub fn snippet_text(snippet: &Term) -> String {
    match snippet {
        Term::Literal {
            lexical,
            datatype: None,
            language: None,
        } => lexical.trim().to_string(),
        other => {
            let rendered = other.to_string();
            let trimmed = rendered.trim();
            trimmed
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
                .unwrap_or(trimmed)
                .to_string()
        }
    }
}

/// `VALUES (?query ?i0 ?i1 ...) { (\n<snippet>\n<arg0>\n...\n)}`: `?query` binds the snippet,
/// `?iN` binds the N-th function argument.
pub fn bindings_clause(args: &[Term]) -> String {
    let var_names = (0..args.len().saturating_sub(1))
        .map(|i| format!("?i{}", i))
        .collect::<Vec<_>>()
        .join(" ");
    let var_values = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join("\n");

    format!("VALUES (?query {}) {{ (\n{}\n)}}", var_names, var_values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEMPLATE: &str = "SELECT ?result WHERE {\n  %bindings%\n  %query_snippet%\n}";

    #[test]
    fn test_bindings_clause() {
        let args = vec![Term::string("?x a :Foo"), Term::integer(1), Term::iri("http://ex.org/n")];
        assert_eq!(
            bindings_clause(&args),
            "VALUES (?query ?i0 ?i1) { (\n\"?x a :Foo\"\n1\n<http://ex.org/n>\n)}"
        );
    }

    #[test]
    fn test_bindings_clause_snippet_only() {
        let args = vec![Term::string("BIND(1 AS ?result)")];
        assert_eq!(
            bindings_clause(&args),
            "VALUES (?query ) { (\n\"BIND(1 AS ?result)\"\n)}"
        );
    }

    #[test]
    fn test_snippet_text() {
        assert_eq!(snippet_text(&Term::string("  BIND(?i0 AS ?result) ")), "BIND(?i0 AS ?result)");
        assert_eq!(snippet_text(&Term::lang("x", "en")), "\"x\"@en");
        assert_eq!(snippet_text(&Term::integer(3)), "3");
    }

    #[test]
    fn test_build_substitutes_both_slots() {
        let template = QueryTemplate::new(TEMPLATE).unwrap();
        let query = template
            .build(&[Term::string("BIND(?i0 + 1 AS ?result)"), Term::integer(1)])
            .unwrap();
        assert!(query.contains("VALUES (?query ?i0) { (\n\"BIND(?i0 + 1 AS ?result)\"\n1\n)}"));
        assert!(query.contains("\n  BIND(?i0 + 1 AS ?result)\n}"));
        assert!(!query.contains(SNIPPET_PLACEHOLDER));
        assert!(!query.contains(BINDINGS_PLACEHOLDER));
    }

    #[test]
    fn test_build_requires_snippet() {
        let template = QueryTemplate::new(TEMPLATE).unwrap();
        assert!(matches!(template.build(&[]), Err(MineralError::Usage(_))));
    }

    #[test]
    fn test_template_needs_placeholders() {
        assert!(QueryTemplate::new("SELECT * WHERE { %bindings% }").is_err());
        assert!(QueryTemplate::new("SELECT * WHERE { %query_snippet% }").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "SELECT ?result WHERE {{").unwrap();
        writeln!(file, "  %bindings% %query_snippet%").unwrap();
        writeln!(file, "}}").unwrap();

        let template = QueryTemplate::load(file.path()).unwrap();
        assert_eq!(
            template.text(),
            "SELECT ?result WHERE {\n  %bindings% %query_snippet%\n}"
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            QueryTemplate::load(&dir.path().join("missing.rq")),
            Err(MineralError::Template(_))
        ));
    }
}
