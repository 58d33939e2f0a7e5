use mineral_core::Term;
use std::fmt;

/// What a single call produced.
///
/// Everything except `Value` collapses to the `_:noResult` blank node when handed back to the
/// host query, but callers inside the crate can still tell the cases apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Value(Term),
    /// The oracle returned no rows, or an unbound result in the first row.
    NoMatch,
    /// The key was already being evaluated further up the recursion.
    CycleDetected,
    /// The `fast` strategy cut the branch without asking the oracle.
    Pruned,
}

impl Outcome {
    pub fn value(&self) -> Option<&Term> {
        match self {
            Outcome::Value(term) => Some(term),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    pub fn into_term(self) -> Term {
        match self {
            Outcome::Value(term) => term,
            _ => Term::no_result(),
        }
    }

    pub fn to_term(&self) -> Term {
        self.clone().into_term()
    }
}

impl From<Option<Term>> for Outcome {
    fn from(term: Option<Term>) -> Self {
        term.map_or(Outcome::NoMatch, Outcome::Value)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(term) => write!(f, "{}", term),
            Outcome::NoMatch => f.write_str("no match"),
            Outcome::CycleDetected => f.write_str("cycle detected"),
            Outcome::Pruned => f.write_str("pruned"),
        }
    }
}
