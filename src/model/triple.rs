//! Triples and quads.

use std::fmt;

use serde::{Deserialize, Serialize};
use super::{Iri, Term};

/// A subject–predicate–object statement.
///
/// Ordering is by subject, then predicate, then object, which keeps all
/// statements about one subject adjacent in a sorted set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Iri,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<Term>, predicate: impl Into<Iri>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// True if `term` is this triple's subject or object.
    pub fn mentions(&self, term: &Term) -> bool {
        self.subject == *term || self.object == *term
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// Which graph of a store a triple lives in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GraphName {
    /// The live data graph.
    Default,
    Named(Iri),
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphName::Default => write!(f, "DEFAULT"),
            GraphName::Named(iri) => write!(f, "{iri}"),
        }
    }
}

/// A triple placed in a graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quad {
    pub triple: Triple,
    pub graph: GraphName,
}

impl Quad {
    pub fn new(triple: Triple, graph: GraphName) -> Self {
        Self { triple, graph }
    }
}
