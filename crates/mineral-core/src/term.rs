//! RDF terms as they flow through the recursive function: call arguments, oracle results and
//! the "no result" sentinel.
//!
//! The textual form produced by [`Display`](std::fmt::Display) is SPARQL surface syntax, so a
//! rendered term can be pasted straight into a `VALUES` block. The total order implemented by
//! [`Ord`] follows `ORDER BY` semantics: blank nodes, then IRIs, then literals, with numeric
//! literals compared by value.

use crate::error::{MineralError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

/// Label of the blank node returned whenever a call has nothing to give back.
pub const NO_RESULT_LABEL: &str = "noResult";

const NUMERIC_TYPES: &[&str] = &[
    "integer",
    "decimal",
    "double",
    "float",
    "int",
    "long",
    "short",
    "byte",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "positiveInteger",
    "negativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

const NON_INTEGER_TYPES: &[&str] = &["decimal", "double", "float"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal {
        lexical: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    /// Plain string literal.
    pub fn string(lexical: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        Term::Literal {
            lexical: lexical.into(),
            datatype: if datatype == XSD_STRING {
                None
            } else {
                Some(datatype)
            },
            language: None,
        }
    }

    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), XSD_INTEGER)
    }

    pub fn decimal(lexical: impl Into<String>) -> Self {
        Self::typed(lexical, XSD_DECIMAL)
    }

    pub fn double(value: f64) -> Self {
        Self::typed(format!("{:e}", value), XSD_DOUBLE)
    }

    pub fn boolean(value: bool) -> Self {
        Self::typed(value.to_string(), XSD_BOOLEAN)
    }

    /// The sentinel handed to the outer query when a call produced no value.
    pub fn no_result() -> Self {
        Term::BlankNode(NO_RESULT_LABEL.to_string())
    }

    pub fn is_no_result(&self) -> bool {
        matches!(self, Term::BlankNode(label) if label == NO_RESULT_LABEL)
    }

    pub fn lexical(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::BlankNode(label) => label,
            Term::Literal { lexical, .. } => lexical,
        }
    }

    pub fn datatype(&self) -> Option<&str> {
        match self {
            Term::Literal { datatype, .. } => datatype.as_deref(),
            _ => None,
        }
    }

    /// Numeric value of a numeric literal, `None` for anything else.
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            Term::Literal {
                lexical,
                datatype: Some(dt),
                ..
            } => {
                let local = dt.strip_prefix(XSD)?;
                if NUMERIC_TYPES.contains(&local) {
                    lexical.trim().parse::<f64>().ok()
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Sign and magnitude digits (no leading zeros) of an integer-family literal.
    fn integer_parts(&self) -> Option<(bool, &str)> {
        let Term::Literal {
            lexical,
            datatype: Some(dt),
            ..
        } = self
        else {
            return None;
        };
        let local = dt.strip_prefix(XSD)?;
        if !NUMERIC_TYPES.contains(&local) || NON_INTEGER_TYPES.contains(&local) {
            return None;
        }
        let lexical = lexical.trim();
        if !is_integer(lexical) {
            return None;
        }
        let negative = lexical.starts_with('-');
        let digits = strip_sign(lexical).trim_start_matches('0');
        if digits.is_empty() {
            Some((false, "0"))
        } else {
            Some((negative, digits))
        }
    }

    fn boolean_value(&self) -> Option<bool> {
        match self {
            Term::Literal {
                lexical,
                datatype: Some(dt),
                ..
            } if dt == XSD_BOOLEAN => match lexical.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Term::BlankNode(_) => 0,
            Term::Iri(_) => 1,
            Term::Literal { .. } => {
                if self.numeric_value().is_some() {
                    2
                } else if self.boolean_value().is_some() {
                    3
                } else {
                    4
                }
            }
        }
    }

    fn literal_parts(&self) -> (&str, Option<&str>, Option<&str>) {
        match self {
            Term::Literal {
                lexical,
                datatype,
                language,
            } => (lexical, language.as_deref(), datatype.as_deref()),
            Term::Iri(s) | Term::BlankNode(s) => (s, None, None),
        }
    }

    /// `ORDER BY` comparison. Total: terms compare equal only when they are identical.
    pub fn sparql_cmp(&self, other: &Self) -> Ordering {
        let by_kind = self.kind_rank().cmp(&other.kind_rank());
        if by_kind != Ordering::Equal {
            return by_kind;
        }

        let by_value = match (self.integer_parts(), other.integer_parts()) {
            (Some(a), Some(b)) => cmp_integers(a, b),
            _ => self.value_cmp(other),
        };

        by_value.then_with(|| self.literal_parts().cmp(&other.literal_parts()))
    }

    fn value_cmp(&self, other: &Self) -> Ordering {
        match (self.numeric_value(), other.numeric_value()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => match (self.boolean_value(), other.boolean_value()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }
}

/// Exact comparison of arbitrarily large integers; `f64` loses precision past 2^53.
fn cmp_integers(a: (bool, &str), b: (bool, &str)) -> Ordering {
    match (a.0, b.0) {
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        (negative, _) => {
            let magnitude = a.1.len().cmp(&b.1.len()).then_with(|| a.1.cmp(b.1));
            if negative {
                magnitude.reverse()
            } else {
                magnitude
            }
        }
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sparql_cmp(other)
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal {
                lexical,
                datatype,
                language,
            } => {
                if let Some(dt) = datatype {
                    if has_short_form(lexical, dt) {
                        return f.write_str(lexical);
                    }
                }
                write!(f, "\"{}\"", escape(lexical))?;
                if let Some(lang) = language {
                    write!(f, "@{}", lang)
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{}>", dt)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Parses the surface syntax produced by `Display`. Bare words that are not numbers or
/// booleans become plain string literals.
impl FromStr for Term {
    type Err = MineralError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(rest) = s.strip_prefix('<') {
            return rest
                .strip_suffix('>')
                .map(Term::iri)
                .ok_or_else(|| MineralError::Parse(format!("unterminated IRI: {}", s)));
        }
        if let Some(label) = s.strip_prefix("_:") {
            if label.is_empty() {
                return Err(MineralError::Parse("empty blank node label".to_string()));
            }
            return Ok(Term::blank(label));
        }
        if s.starts_with('"') {
            return parse_quoted(s);
        }
        if s == "true" || s == "false" {
            return Ok(Term::typed(s, XSD_BOOLEAN));
        }
        if is_integer(s) {
            return Ok(Term::typed(s, XSD_INTEGER));
        }
        if is_decimal(s) {
            return Ok(Term::typed(s, XSD_DECIMAL));
        }
        if is_double(s) {
            return Ok(Term::typed(s, XSD_DOUBLE));
        }
        Ok(Term::string(s))
    }
}

fn parse_quoted(s: &str) -> Result<Term> {
    let mut lexical = String::new();
    let mut chars = s[1..].char_indices();
    let mut end = None;
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => lexical.push('\n'),
                Some((_, 'r')) => lexical.push('\r'),
                Some((_, 't')) => lexical.push('\t'),
                Some((_, other)) => lexical.push(other),
                None => break,
            },
            '"' => {
                end = Some(i + 2);
                break;
            }
            other => lexical.push(other),
        }
    }

    let end = end.ok_or_else(|| MineralError::Parse(format!("unterminated literal: {}", s)))?;
    let suffix = &s[end..];
    if suffix.is_empty() {
        Ok(Term::string(lexical))
    } else if let Some(lang) = suffix.strip_prefix('@') {
        Ok(Term::lang(lexical, lang))
    } else if let Some(dt) = suffix
        .strip_prefix("^^<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        Ok(Term::typed(lexical, dt))
    } else {
        Err(MineralError::Parse(format!(
            "unexpected literal suffix '{}' in {}",
            suffix, s
        )))
    }
}

fn escape(lexical: &str) -> String {
    let mut out = String::with_capacity(lexical.len());
    for c in lexical.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn has_short_form(lexical: &str, datatype: &str) -> bool {
    match datatype {
        XSD_INTEGER => is_integer(lexical),
        XSD_DECIMAL => is_decimal(lexical),
        XSD_DOUBLE => is_double(lexical),
        XSD_BOOLEAN => lexical == "true" || lexical == "false",
        _ => false,
    }
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(['+', '-']).unwrap_or(s)
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_integer(s: &str) -> bool {
    all_digits(strip_sign(s))
}

fn is_decimal(s: &str) -> bool {
    match strip_sign(s).split_once('.') {
        Some((int, frac)) => (int.is_empty() || all_digits(int)) && all_digits(frac),
        None => false,
    }
}

fn is_double(s: &str) -> bool {
    let Some((mantissa, exponent)) = strip_sign(s).split_once(['e', 'E']) else {
        return false;
    };
    let mantissa_ok = match mantissa.split_once('.') {
        Some((int, frac)) => {
            (all_digits(int) && (frac.is_empty() || all_digits(frac)))
                || (int.is_empty() && all_digits(frac))
        }
        None => all_digits(mantissa),
    };
    mantissa_ok && is_integer(exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_short_forms() {
        assert_eq!(Term::integer(1).to_string(), "1");
        assert_eq!(Term::decimal("2.5").to_string(), "2.5");
        assert_eq!(Term::boolean(true).to_string(), "true");
        assert_eq!(Term::double(1000.0).to_string(), "1e3");
        assert_eq!(
            Term::typed("abc", XSD_INTEGER).to_string(),
            format!("\"abc\"^^<{}>", XSD_INTEGER)
        );
    }

    #[test]
    fn test_display_quoting() {
        assert_eq!(Term::string("?x a :Foo").to_string(), "\"?x a :Foo\"");
        assert_eq!(Term::string("say \"hi\"").to_string(), "\"say \\\"hi\\\"\"");
        assert_eq!(Term::lang("chat", "fr").to_string(), "\"chat\"@fr");
        assert_eq!(Term::iri("http://ex.org/a").to_string(), "<http://ex.org/a>");
        assert_eq!(Term::no_result().to_string(), "_:noResult");
    }

    #[test]
    fn test_xsd_string_is_plain() {
        assert_eq!(Term::typed("x", XSD_STRING), Term::string("x"));
    }

    #[test]
    fn test_parse_surface_syntax() {
        assert_eq!("<http://ex.org/a>".parse::<Term>().unwrap(), Term::iri("http://ex.org/a"));
        assert_eq!("_:b0".parse::<Term>().unwrap(), Term::blank("b0"));
        assert_eq!("42".parse::<Term>().unwrap(), Term::integer(42));
        assert_eq!("-0.5".parse::<Term>().unwrap(), Term::decimal("-0.5"));
        assert_eq!("\"chat\"@fr".parse::<Term>().unwrap(), Term::lang("chat", "fr"));
        assert_eq!(
            format!("\"7\"^^<{}>", XSD_INTEGER).parse::<Term>().unwrap(),
            Term::integer(7)
        );
        assert_eq!("hello".parse::<Term>().unwrap(), Term::string("hello"));
        assert!("<broken".parse::<Term>().is_err());
        assert!("\"open".parse::<Term>().is_err());
    }

    #[test]
    fn test_parse_display_agree() {
        for term in [
            Term::string("line\nbreak \"quoted\""),
            Term::lang("x", "en-GB"),
            Term::typed("2020-01-01", "http://www.w3.org/2001/XMLSchema#date"),
            Term::integer(-3),
        ] {
            assert_eq!(term.to_string().parse::<Term>().unwrap(), term);
        }
    }

    #[test]
    fn test_order_by_kind() {
        let blank = Term::no_result();
        let iri = Term::iri("http://ex.org/a");
        let number = Term::integer(1);
        let text = Term::string("a");
        assert!(blank < iri);
        assert!(iri < number);
        assert!(number < text);
    }

    #[test]
    fn test_numeric_order_by_value() {
        assert!(Term::integer(9) < Term::integer(10));
        assert!(Term::decimal("2.5") < Term::integer(3));
        assert!(Term::double(-1.0) < Term::decimal("0.0"));
        assert_ne!(Term::integer(1).cmp(&Term::decimal("1.0")), Ordering::Equal);
    }

    #[test]
    fn test_large_integers_order_exactly() {
        let below = Term::typed("9999999999999999999", XSD_INTEGER);
        let above = Term::typed("10000000000000000001", XSD_INTEGER);
        assert_eq!(below.cmp(&above), Ordering::Less);
        assert!(Term::typed("9007199254740993", XSD_INTEGER) > Term::integer(9007199254740992));
        assert!(
            Term::typed("-10000000000000000001", XSD_INTEGER)
                < Term::typed("-9999999999999999999", XSD_INTEGER)
        );
        assert!(Term::typed("-0", XSD_INTEGER) < Term::integer(1));
        assert_ne!(
            Term::typed("007", XSD_INTEGER).cmp(&Term::integer(7)),
            Ordering::Equal
        );
        assert!(Term::typed("007", XSD_INTEGER) < Term::integer(8));
    }

    #[test]
    fn test_order_is_consistent_with_eq() {
        let a = Term::lang("x", "en");
        let b = Term::string("x");
        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }
}
