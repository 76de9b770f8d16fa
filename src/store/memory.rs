//! In-memory triple store.
//!
//! This is the reference implementation of `TripleStore`. Each named graph
//! is a [`Graph`] behind one shared lock, so an update is atomic with
//! respect to every reader.
//!
//! Use this store for:
//! - Testing templates, instance diffs and history without a database
//! - Embedding the engine in tools that don't need persistence

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::*;
use crate::Result;
use super::{Query, TripleStore, Update, UpdateStats};

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory quad storage.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    graphs: RwLock<HashMap<GraphName, Graph>>,
    /// Number of updates applied through [`TripleStore::update`].
    updates: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many updates have been applied. Seeding via [`load`](Self::load)
    /// does not count.
    pub fn update_count(&self) -> u64 {
        self.inner.updates.load(Ordering::SeqCst)
    }

    /// Add triples to a graph directly.
    pub fn load(&self, graph: GraphName, triples: impl IntoIterator<Item = Triple>) {
        let mut graphs = self.inner.graphs.write();
        graphs.entry(graph).or_default().extend(triples);
    }

    /// Copy of one graph's current contents.
    pub fn snapshot(&self, graph: &GraphName) -> Graph {
        self.inner.graphs.read().get(graph).cloned().unwrap_or_default()
    }

    /// Every non-empty graph name, sorted.
    pub fn graph_names(&self) -> Vec<GraphName> {
        let mut names: Vec<GraphName> = self
            .inner
            .graphs
            .read()
            .iter()
            .filter(|(_, g)| !g.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Total triples across all graphs.
    pub fn len(&self) -> usize {
        self.inner.graphs.read().values().map(Graph::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("triples", &self.len())
            .field("updates", &self.update_count())
            .finish()
    }
}

// ============================================================================
// Blank node scoping
// ============================================================================

/// Blank nodes arriving in an update are scoped to it, as with SPARQL
/// `INSERT DATA`: a label the target graph already held before the update
/// keeps naming that node, any other label gets a fresh store-wide one.
struct BlankLabels {
    known: HashMap<GraphName, BTreeSet<String>>,
    fresh: HashMap<String, String>,
}

impl BlankLabels {
    fn before(graphs: &HashMap<GraphName, Graph>, update: &Update) -> Self {
        let mut known = HashMap::new();
        for quad in &update.insert {
            known
                .entry(quad.graph.clone())
                .or_insert_with(|| graphs.get(&quad.graph).map(Graph::blank_node_labels).unwrap_or_default());
        }
        Self { known, fresh: HashMap::new() }
    }

    fn place(&mut self, graph: &GraphName, triple: &Triple) -> Triple {
        Triple {
            subject: self.term(graph, &triple.subject),
            predicate: triple.predicate.clone(),
            object: self.term(graph, &triple.object),
        }
    }

    fn term(&mut self, graph: &GraphName, term: &Term) -> Term {
        let Term::BlankNode(b) = term else {
            return term.clone();
        };
        if self.known.get(graph).is_some_and(|labels| labels.contains(b.label())) {
            return term.clone();
        }
        let fresh = self
            .fresh
            .entry(b.label().to_string())
            .or_insert_with(|| format!("b{}", uuid::Uuid::new_v4().simple()));
        Term::blank(fresh.clone())
    }
}

// ============================================================================
// TripleStore implementation
// ============================================================================

#[async_trait]
impl TripleStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn construct(&self, query: &Query) -> Result<Vec<Triple>> {
        let graphs = self.inner.graphs.read();
        Ok(graphs.get(query.graph()).map(|g| query.evaluate(g)).unwrap_or_default())
    }

    async fn update(&self, update: &Update) -> Result<UpdateStats> {
        let mut stats = UpdateStats::default();
        let mut graphs = self.inner.graphs.write();
        let mut labels = BlankLabels::before(&graphs, update);

        if let Some(shape_delete) = &update.delete_shape {
            if let Some(graph) = graphs.get_mut(&shape_delete.graph) {
                let doomed = shape_delete.shape.extract(graph, &shape_delete.root);
                for triple in &doomed {
                    if graph.remove(triple) {
                        stats.triples_deleted += 1;
                    }
                }
            }
        }

        for quad in &update.delete {
            if let Some(graph) = graphs.get_mut(&quad.graph) {
                if graph.remove(&quad.triple) {
                    stats.triples_deleted += 1;
                }
            }
        }

        for quad in &update.insert {
            let triple = labels.place(&quad.graph, &quad.triple);
            if graphs.entry(quad.graph.clone()).or_default().insert(triple) {
                stats.triples_inserted += 1;
            }
        }

        graphs.retain(|_, g| !g.is_empty());
        drop(graphs);

        self.inner.updates.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            inserted = stats.triples_inserted,
            deleted = stats.triples_deleted,
            "memory store update applied"
        );
        Ok(stats)
    }
}
