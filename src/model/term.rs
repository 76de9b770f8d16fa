//! RDF terms: IRIs, blank nodes and literals.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::vocab::{rdf, xsd};

/// An absolute IRI, stored without angle brackets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(String);

impl Iri {
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The part after `namespace`, if this IRI lives in it.
    pub fn local_name<'a>(&'a self, namespace: &str) -> Option<&'a str> {
        self.0.strip_prefix(namespace)
    }
}

impl From<&str> for Iri {
    fn from(v: &str) -> Self { Iri(v.to_owned()) }
}

impl From<String> for Iri {
    fn from(v: String) -> Self { Iri(v) }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// A blank node, identified by its label within one store or document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlankNode(String);

impl BlankNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.0)
    }
}

/// How a literal's lexical value is annotated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    /// Plain literal, equivalent to `xsd:string`.
    Simple,
    Typed(Iri),
    /// Language-tagged string; the tag is kept lowercase.
    Lang(String),
}

/// A literal value.
///
/// Two literals are equal when value, datatype and language all match.
/// `"x"^^xsd:string` is normalized to the simple literal `"x"` on
/// construction so both spellings compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    value: String,
    kind: LiteralKind,
}

impl Literal {
    pub fn simple(value: impl Into<String>) -> Self {
        Self { value: value.into(), kind: LiteralKind::Simple }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<Iri>) -> Self {
        let datatype = datatype.into();
        let kind = if datatype.as_str() == xsd::STRING {
            LiteralKind::Simple
        } else {
            LiteralKind::Typed(datatype)
        };
        Self { value: value.into(), kind }
    }

    pub fn lang(value: impl Into<String>, tag: &str) -> Self {
        Self { value: value.into(), kind: LiteralKind::Lang(tag.to_ascii_lowercase()) }
    }

    /// `xsd:dateTime` literal in UTC with millisecond precision.
    pub fn date_time(at: DateTime<Utc>) -> Self {
        Self::typed(at.to_rfc3339_opts(SecondsFormat::Millis, true), xsd::DATE_TIME)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> &LiteralKind {
        &self.kind
    }

    /// Effective datatype (`rdf:langString` for tagged literals).
    pub fn datatype(&self) -> Iri {
        match &self.kind {
            LiteralKind::Simple => Iri::new(xsd::STRING),
            LiteralKind::Typed(dt) => dt.clone(),
            LiteralKind::Lang(_) => Iri::new(rdf::LANG_STRING),
        }
    }

    pub fn language(&self) -> Option<&str> {
        match &self.kind {
            LiteralKind::Lang(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// N-Triples syntax, escaped by `oxrdf`.
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.as_str();
        match &self.kind {
            LiteralKind::Simple => write!(f, "{}", oxrdf::LiteralRef::new_simple_literal(value)),
            LiteralKind::Typed(dt) => write!(
                f,
                "{}",
                oxrdf::LiteralRef::new_typed_literal(value, oxrdf::NamedNodeRef::new_unchecked(dt.as_str()))
            ),
            LiteralKind::Lang(tag) => {
                write!(f, "{}", oxrdf::LiteralRef::new_language_tagged_literal_unchecked(value, tag))
            }
        }
    }
}

/// Any RDF term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Term {
    Iri(Iri),
    BlankNode(BlankNode),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(Iri::new(iri))
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(BlankNode::new(label))
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal::simple(value))
    }

    pub fn is_iri(&self) -> bool { matches!(self, Term::Iri(_)) }
    pub fn is_blank_node(&self) -> bool { matches!(self, Term::BlankNode(_)) }
    pub fn is_literal(&self) -> bool { matches!(self, Term::Literal(_)) }

    /// IRIs and blank nodes can appear as subjects.
    pub fn is_resource(&self) -> bool {
        !self.is_literal()
    }

    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_blank_node(&self) -> Option<&BlankNode> {
        match self {
            Term::BlankNode(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }
}

impl From<Iri> for Term {
    fn from(v: Iri) -> Self { Term::Iri(v) }
}
impl From<&Iri> for Term {
    fn from(v: &Iri) -> Self { Term::Iri(v.clone()) }
}
impl From<BlankNode> for Term {
    fn from(v: BlankNode) -> Self { Term::BlankNode(v) }
}
impl From<Literal> for Term {
    fn from(v: Literal) -> Self { Term::Literal(v) }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "{iri}"),
            Term::BlankNode(b) => write!(f, "{b}"),
            Term::Literal(l) => write!(f, "{l}"),
        }
    }
}
