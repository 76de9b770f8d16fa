//! SHACL property paths and form shapes.
//!
//! A [`Shape`] is the extraction plan a template implies for its instances:
//! which property paths hang off the instance root, and which listings lead
//! to nested resources that carry their own fields. Extraction is
//! deterministic, so the same store state always yields the same triples
//! (including the same blank node labels). The diff engine relies on that.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::vocab::{form, mu, rdf, sh};
use super::{Graph, Iri, Term, Triple};
use crate::{Error, Result};

/// Nodes reached by walking a path; usually one or two.
pub type Reached = SmallVec<[Term; 4]>;

/// A SHACL property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyPath {
    Predicate(Iri),
    Inverse(Box<PropertyPath>),
    Sequence(Vec<PropertyPath>),
    Alternative(Vec<PropertyPath>),
}

impl PropertyPath {
    /// Read the path rooted at `node` in a template graph.
    pub fn from_graph(graph: &Graph, node: &Term) -> Result<PropertyPath> {
        if let Term::Iri(iri) = node {
            if iri.as_str() != rdf::NIL {
                return Ok(PropertyPath::Predicate(iri.clone()));
            }
        }

        if let Some(inner) = graph.object(node, &Iri::new(sh::INVERSE_PATH)) {
            return Ok(PropertyPath::Inverse(Box::new(Self::from_graph(graph, inner)?)));
        }

        if let Some(list) = graph.object(node, &Iri::new(sh::ALTERNATIVE_PATH)) {
            let items = graph
                .list_items(list)
                .ok_or_else(|| Error::InvalidTemplate(format!("malformed alternative path at {node}")))?;
            return Ok(PropertyPath::Alternative(
                items.iter().map(|i| Self::from_graph(graph, i)).collect::<Result<_>>()?,
            ));
        }

        if let Some(items) = graph.list_items(node) {
            if items.is_empty() {
                return Err(Error::InvalidTemplate(format!("empty sequence path at {node}")));
            }
            return Ok(PropertyPath::Sequence(
                items.iter().map(|i| Self::from_graph(graph, i)).collect::<Result<_>>()?,
            ));
        }

        Err(Error::InvalidTemplate(format!("unsupported property path at {node}")))
    }

    /// The same path walked backwards.
    pub fn inverted(&self) -> PropertyPath {
        match self {
            PropertyPath::Predicate(_) => PropertyPath::Inverse(Box::new(self.clone())),
            PropertyPath::Inverse(inner) => (**inner).clone(),
            PropertyPath::Sequence(steps) => {
                PropertyPath::Sequence(steps.iter().rev().map(Self::inverted).collect())
            }
            PropertyPath::Alternative(alts) => {
                PropertyPath::Alternative(alts.iter().map(Self::inverted).collect())
            }
        }
    }

    /// Walk the path from `start`, recording every traversed triple in
    /// `traversed`. Partial matches of a sequence still contribute the
    /// triples of the steps that did match.
    pub fn walk(&self, graph: &Graph, start: &Term, traversed: &mut BTreeSet<Triple>) -> Reached {
        let mut reached = Reached::new();
        match self {
            PropertyPath::Predicate(p) => {
                for t in graph.triples_matching(Some(start), Some(p), None) {
                    traversed.insert(t.clone());
                    reached.push(t.object.clone());
                }
            }
            PropertyPath::Inverse(inner) => match inner.as_ref() {
                PropertyPath::Predicate(p) => {
                    for t in graph.triples_matching(None, Some(p), Some(start)) {
                        traversed.insert(t.clone());
                        reached.push(t.subject.clone());
                    }
                }
                other => return other.inverted().walk(graph, start, traversed),
            },
            PropertyPath::Sequence(steps) => {
                let mut frontier = Reached::new();
                frontier.push(start.clone());
                for step in steps {
                    let mut next = Reached::new();
                    for node in &frontier {
                        for found in step.walk(graph, node, traversed) {
                            if !next.contains(&found) {
                                next.push(found);
                            }
                        }
                    }
                    frontier = next;
                    if frontier.is_empty() {
                        break;
                    }
                }
                reached = frontier;
            }
            PropertyPath::Alternative(alts) => {
                for alt in alts {
                    for found in alt.walk(graph, start, traversed) {
                        if !reached.contains(&found) {
                            reached.push(found);
                        }
                    }
                }
            }
        }
        reached
    }
}

/// A listing: resources reached through `scope`, each shaped by `each`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingShape {
    pub scope: PropertyPath,
    pub each: Shape,
}

/// What a form says belongs to one of its instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub fields: Vec<PropertyPath>,
    pub listings: Vec<ListingShape>,
}

impl Shape {
    /// Derive the shape of the form node `form_node`.
    ///
    /// Fields are the `form:includes` targets that carry an `sh:path`;
    /// listings are included `form:Listing` nodes with a `form:scope` and a
    /// `form:each` sub-form. A sub-form that includes itself (directly or
    /// through other listings) is only expanded once.
    pub fn from_form(graph: &Graph, form_node: &Term) -> Result<Shape> {
        let mut stack = Vec::new();
        Self::build(graph, form_node, &mut stack)
    }

    fn build(graph: &Graph, form_node: &Term, stack: &mut Vec<Term>) -> Result<Shape> {
        stack.push(form_node.clone());
        let includes = Iri::new(form::INCLUDES);
        let path = Iri::new(sh::PATH);
        let scope = Iri::new(form::SCOPE);
        let each = Iri::new(form::EACH);

        let mut shape = Shape::default();
        for included in graph.objects(form_node, &includes) {
            if graph.has_type(included, form::LISTING) {
                let (Some(scope_node), Some(sub_form)) =
                    (graph.object(included, &scope), graph.object(included, &each))
                else {
                    return Err(Error::InvalidTemplate(format!(
                        "listing {included} needs both form:scope and form:each"
                    )));
                };
                let scope_path = graph
                    .object(scope_node, &path)
                    .ok_or_else(|| Error::InvalidTemplate(format!("scope of {included} has no sh:path")))?;
                let each_shape = if stack.contains(sub_form) {
                    Shape::default()
                } else {
                    Self::build(graph, sub_form, stack)?
                };
                shape.listings.push(ListingShape {
                    scope: PropertyPath::from_graph(graph, scope_path)?,
                    each: each_shape,
                });
            } else if let Some(field_path) = graph.object(included, &path) {
                let field = PropertyPath::from_graph(graph, field_path)?;
                if !shape.fields.contains(&field) {
                    shape.fields.push(field);
                }
            }
        }
        stack.pop();
        Ok(shape)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.listings.is_empty()
    }

    /// The triples this shape attributes to `root` in `graph`: the root's
    /// identity (`rdf:type`, `mu:uuid`), every field path, and recursively
    /// the resources reached through listings.
    pub fn extract(&self, graph: &Graph, root: &Term) -> BTreeSet<Triple> {
        let mut out = BTreeSet::new();
        let mut visited = BTreeSet::new();
        self.collect(graph, root, &mut out, &mut visited);
        out
    }

    fn collect(&self, graph: &Graph, node: &Term, out: &mut BTreeSet<Triple>, visited: &mut BTreeSet<Term>) {
        if !visited.insert(node.clone()) {
            return;
        }
        for predicate in identity_predicates() {
            out.extend(graph.triples_matching(Some(node), Some(&predicate), None).cloned());
        }
        for field in &self.fields {
            field.walk(graph, node, out);
        }
        for listing in &self.listings {
            for member in listing.scope.walk(graph, node, out) {
                if member.is_resource() {
                    listing.each.collect(graph, &member, out, visited);
                }
            }
        }
    }
}

/// Predicates every shaped resource contributes regardless of its fields.
pub fn identity_predicates() -> [Iri; 2] {
    [Iri::new(rdf::TYPE), Iri::new(mu::UUID)]
}
