//! # Triple Store Trait
//!
//! This is the contract between the form engine and whatever holds the
//! data. Everything the engine reads goes through [`TripleStore::construct`]
//! or [`TripleStore::ask`]; everything it writes goes through one
//! [`TripleStore::update`] call per logical operation.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory quads for testing/embedding |
//! | `SparqlStore` | `sparql` | Remote SPARQL 1.1 endpoint over HTTP |

pub mod memory;
pub mod sparql;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::Result;

pub use memory::MemoryStore;
pub use sparql::SparqlConfig;
#[cfg(feature = "sparql")]
pub use sparql::SparqlStore;

// ============================================================================
// Backend Configuration
// ============================================================================

/// Which store the engine talks to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// In-memory (no persistence)
    #[default]
    Memory,

    /// SPARQL 1.1 query/update endpoint
    #[cfg(feature = "sparql")]
    Sparql(SparqlConfig),
}

// ============================================================================
// Queries
// ============================================================================

/// A single triple pattern; `None` positions are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: Option<Term>,
    pub predicate: Option<Iri>,
    pub object: Option<Term>,
}

impl TriplePattern {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<Term>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn predicate(mut self, predicate: impl Into<Iri>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn object(mut self, object: impl Into<Term>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        self.subject.as_ref().is_none_or(|s| *s == triple.subject)
            && self.predicate.as_ref().is_none_or(|p| *p == triple.predicate)
            && self.object.as_ref().is_none_or(|o| *o == triple.object)
    }
}

/// Which subjects a [`Query::Describe`] covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectSelector {
    /// Every `?s` with `?s predicate o` for some `o` in `objects`.
    Matching { predicate: Iri, objects: Vec<Term> },
    /// Exactly these subjects.
    Exactly(Vec<Term>),
}

/// A read that returns triples.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// All triples matching one pattern.
    Pattern { graph: GraphName, pattern: TriplePattern },

    /// Outgoing triples of the selected subjects, limited to `predicates`
    /// (all predicates when empty).
    Describe {
        graph: GraphName,
        subjects: SubjectSelector,
        predicates: Vec<Iri>,
    },

    /// The triples `shape` attributes to `root`.
    Shape { graph: GraphName, root: Term, shape: Shape },
}

impl Query {
    pub fn pattern(pattern: TriplePattern) -> Self {
        Query::Pattern { graph: GraphName::Default, pattern }
    }

    pub fn describe(subjects: Vec<Term>) -> Self {
        Query::Describe {
            graph: GraphName::Default,
            subjects: SubjectSelector::Exactly(subjects),
            predicates: Vec::new(),
        }
    }

    pub fn graph(&self) -> &GraphName {
        match self {
            Query::Pattern { graph, .. } | Query::Describe { graph, .. } | Query::Shape { graph, .. } => graph,
        }
    }

    /// Evaluate against an in-memory graph.
    pub fn evaluate(&self, data: &Graph) -> Vec<Triple> {
        match self {
            Query::Pattern { pattern, .. } => data
                .triples_matching(pattern.subject.as_ref(), pattern.predicate.as_ref(), pattern.object.as_ref())
                .cloned()
                .collect(),
            Query::Describe { subjects, predicates, .. } => {
                let selected: Vec<&Term> = match subjects {
                    SubjectSelector::Exactly(subjects) => subjects.iter().collect(),
                    SubjectSelector::Matching { predicate, objects } => {
                        let mut found = Vec::new();
                        for object in objects {
                            for s in data.subjects(predicate, Some(object)) {
                                if !found.contains(&s) {
                                    found.push(s);
                                }
                            }
                        }
                        found
                    }
                };
                let mut out = Vec::new();
                for subject in selected {
                    if predicates.is_empty() {
                        out.extend(data.triples_matching(Some(subject), None, None).cloned());
                    } else {
                        for p in predicates {
                            out.extend(data.triples_matching(Some(subject), Some(p), None).cloned());
                        }
                    }
                }
                out
            }
            Query::Shape { root, shape, .. } => shape.extract(data, root).into_iter().collect(),
        }
    }
}

// ============================================================================
// Updates
// ============================================================================

/// Delete everything `shape` attributes to `root`, evaluated against the
/// store's state when the update runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDelete {
    pub graph: GraphName,
    pub root: Term,
    pub shape: Shape,
}

/// One atomic write. Applied in order: shape delete, explicit deletes,
/// inserts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub delete_shape: Option<ShapeDelete>,
    pub delete: Vec<Quad>,
    pub insert: Vec<Quad>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(mut self, graph: &GraphName, triples: impl IntoIterator<Item = Triple>) -> Self {
        self.delete.extend(triples.into_iter().map(|t| Quad::new(t, graph.clone())));
        self
    }

    pub fn insert(mut self, graph: &GraphName, triples: impl IntoIterator<Item = Triple>) -> Self {
        self.insert.extend(triples.into_iter().map(|t| Quad::new(t, graph.clone())));
        self
    }

    pub fn delete_shape(mut self, graph: GraphName, root: Term, shape: Shape) -> Self {
        self.delete_shape = Some(ShapeDelete { graph, root, shape });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.delete_shape.is_none() && self.delete.is_empty() && self.insert.is_empty()
    }
}

/// What an update changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStats {
    pub triples_inserted: usize,
    pub triples_deleted: usize,
}

// ============================================================================
// The Trait
// ============================================================================

/// The contract between the form engine and a triple store.
#[async_trait]
pub trait TripleStore: Send + Sync + 'static {
    /// Store name for logs.
    fn name(&self) -> &str;

    /// Run a read and return the matching triples.
    async fn construct(&self, query: &Query) -> Result<Vec<Triple>>;

    /// True if at least one triple in `graph` matches `pattern`.
    async fn ask(&self, graph: &GraphName, pattern: &TriplePattern) -> Result<bool> {
        let query = Query::Pattern { graph: graph.clone(), pattern: pattern.clone() };
        Ok(!self.construct(&query).await?.is_empty())
    }

    /// Apply one update atomically.
    async fn update(&self, update: &Update) -> Result<UpdateStats>;

    /// [`construct`](Self::construct) collected into a [`Graph`].
    async fn construct_graph(&self, query: &Query) -> Result<Graph> {
        Ok(Graph::from_triples(self.construct(query).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matches_wildcards() {
        let t = Triple::new(Term::iri("http://ex.org/a"), "http://ex.org/p", Term::literal("x"));
        assert!(TriplePattern::any().matches(&t));
        assert!(TriplePattern::any().subject(Term::iri("http://ex.org/a")).matches(&t));
        assert!(!TriplePattern::any().predicate("http://ex.org/q").matches(&t));
    }

    #[test]
    fn test_describe_matching_limits_predicates() {
        let g = crate::turtle::parse(
            "@prefix ex: <http://ex.org/> .
             ex:c1 ex:inScheme ex:s ; ex:label \"one\" ; ex:note \"n\" .
             ex:c2 ex:inScheme ex:other ; ex:label \"two\" .",
        )
        .unwrap();
        let q = Query::Describe {
            graph: GraphName::Default,
            subjects: SubjectSelector::Matching {
                predicate: Iri::new("http://ex.org/inScheme"),
                objects: vec![Term::iri("http://ex.org/s")],
            },
            predicates: vec![Iri::new("http://ex.org/label")],
        };
        let out = q.evaluate(&g);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].object, Term::literal("one"));
    }

    #[test]
    fn test_update_builder() {
        let g = GraphName::Default;
        let u = Update::new().insert(&g, [Triple::new(Term::iri("http://ex.org/a"), "http://ex.org/p", Term::literal("x"))]);
        assert!(!u.is_empty());
        assert!(Update::new().is_empty());
    }
}
