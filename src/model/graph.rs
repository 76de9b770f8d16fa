//! Graph: a set of triples plus prefix bindings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::vocab::rdf;
use super::{Iri, Term, Triple};

/// An unordered set of triples.
///
/// Prefixes only matter for serialization: two graphs are equal when they
/// hold the same triples, whatever prefixes they declare. Triples are kept
/// sorted so iteration and serialization are deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    triples: BTreeSet<Triple>,
    prefixes: BTreeMap<String, String>,
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.triples == other.triples
    }
}

impl Eq for Graph {}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        Self { triples: triples.into_iter().collect(), prefixes: BTreeMap::new() }
    }

    /// Insert a triple. Returns false if it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn remove(&mut self, triple: &Triple) -> bool {
        self.triples.remove(triple)
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn retain(&mut self, keep: impl FnMut(&Triple) -> bool) {
        self.triples.retain(keep);
    }

    // ========================================================================
    // Prefixes
    // ========================================================================

    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Copy prefixes from `other`; existing bindings are overwritten.
    pub fn merge_prefixes(&mut self, other: &Graph) {
        for (prefix, ns) in &other.prefixes {
            self.prefixes.insert(prefix.clone(), ns.clone());
        }
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// All triples matching the given pattern; `None` is a wildcard.
    ///
    /// Subject-bound lookups use the sorted order and only visit that
    /// subject's triples.
    pub fn triples_matching<'a, 'b>(
        &'a self,
        subject: Option<&'b Term>,
        predicate: Option<&'b Iri>,
        object: Option<&'b Term>,
    ) -> Box<dyn Iterator<Item = &'a Triple> + 'b>
    where
        'a: 'b,
    {
        let object_matches = move |t: &&Triple| object.is_none_or(|o| t.object == *o);
        match subject {
            Some(s) => {
                let lower = Triple {
                    subject: s.clone(),
                    predicate: predicate.cloned().unwrap_or_else(|| Iri::new("")),
                    object: Term::iri(""),
                };
                Box::new(
                    self.triples
                        .range(lower..)
                        .take_while(move |t| t.subject == *s)
                        .filter(move |t| predicate.is_none_or(|p| t.predicate == *p))
                        .filter(object_matches),
                )
            }
            None => Box::new(
                self.triples
                    .iter()
                    .filter(move |t| predicate.is_none_or(|p| t.predicate == *p))
                    .filter(object_matches),
            ),
        }
    }

    /// Objects of `subject predicate ?o`.
    pub fn objects<'a, 'b>(&'a self, subject: &'b Term, predicate: &'b Iri) -> impl Iterator<Item = &'a Term> + 'b
    where
        'a: 'b,
    {
        self.triples_matching(Some(subject), Some(predicate), None).map(|t| &t.object)
    }

    /// First object of `subject predicate ?o` in sorted order.
    pub fn object<'a>(&'a self, subject: &Term, predicate: &Iri) -> Option<&'a Term> {
        self.objects(subject, predicate).next()
    }

    /// Subjects of `?s predicate object`, deduplicated and sorted.
    pub fn subjects(&self, predicate: &Iri, object: Option<&Term>) -> Vec<&Term> {
        let subjects: BTreeSet<&Term> = self
            .triples_matching(None, Some(predicate), object)
            .map(|t| &t.subject)
            .collect();
        subjects.into_iter().collect()
    }

    /// Subjects typed `ty`.
    pub fn instances_of(&self, ty: &str) -> Vec<&Term> {
        let object = Term::iri(ty);
        let rdf_type = Iri::new(rdf::TYPE);
        self.subjects(&rdf_type, Some(&object))
    }

    pub fn has_type(&self, subject: &Term, ty: &str) -> bool {
        let rdf_type = Iri::new(rdf::TYPE);
        let object = Term::iri(ty);
        self.triples_matching(Some(subject), Some(&rdf_type), Some(&object)).next().is_some()
    }

    /// Every blank node label used as subject or object.
    pub fn blank_node_labels(&self) -> BTreeSet<String> {
        self.triples
            .iter()
            .flat_map(|t| [&t.subject, &t.object])
            .filter_map(|term| term.as_blank_node().map(|b| b.label().to_string()))
            .collect()
    }

    /// Members of the RDF collection starting at `head`, or `None` if the
    /// chain is malformed (missing `rdf:first`, branching, or cyclic).
    pub fn list_items(&self, head: &Term) -> Option<Vec<Term>> {
        let first = Iri::new(rdf::FIRST);
        let rest = Iri::new(rdf::REST);
        let nil = Term::iri(rdf::NIL);

        let mut items = Vec::new();
        let mut seen = BTreeSet::new();
        let mut node = head.clone();
        while node != nil {
            if !seen.insert(node.clone()) {
                return None;
            }
            let item = {
                let mut firsts = self.objects(&node, &first);
                let item = firsts.next()?.clone();
                if firsts.next().is_some() {
                    return None;
                }
                item
            };
            items.push(item);
            node = self.object(&node, &rest)?.clone();
        }
        Some(items)
    }

    // ========================================================================
    // Rewriting
    // ========================================================================

    /// Replace every subject or object occurrence of `from` with `to`.
    /// Returns how many triples were rewritten.
    pub fn rename(&mut self, from: &Term, to: &Term) -> usize {
        if from == to {
            return 0;
        }
        let affected: Vec<Triple> = self.triples.iter().filter(|t| t.mentions(from)).cloned().collect();
        for triple in &affected {
            self.triples.remove(triple);
        }
        let count = affected.len();
        for mut triple in affected {
            if triple.subject == *from {
                triple.subject = to.clone();
            }
            if triple.object == *from {
                triple.object = to.clone();
            }
            self.triples.insert(triple);
        }
        count
    }

    /// Remove every triple `subject predicate ?o`. Returns how many were removed.
    pub fn remove_matching(&mut self, subject: Option<&Term>, predicate: Option<&Iri>, object: Option<&Term>) -> usize {
        let doomed: Vec<Triple> = self.triples_matching(subject, predicate, object).cloned().collect();
        for triple in &doomed {
            self.triples.remove(triple);
        }
        doomed.len()
    }
}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        self.triples.extend(iter);
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self::from_triples(iter)
    }
}

impl IntoIterator for Graph {
    type Item = Triple;
    type IntoIter = std::collections::btree_set::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.into_iter()
    }
}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Triple;
    type IntoIter = std::collections::btree_set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}
