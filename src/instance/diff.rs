//! Instance diff: the minimal patch from a stored graph to a desired one.
//!
//! Triples are compared structurally. Blank nodes compare by label, which
//! only makes sense when both graphs come out of the same deterministic
//! shape extraction; no isomorphism matching is attempted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::store::{TripleStore, Update, UpdateStats};
use crate::Result;

/// Triples to insert and delete. The two sets are always disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    insert: BTreeSet<Triple>,
    delete: BTreeSet<Triple>,
}

impl Patch {
    /// `delete = current − desired`, `insert = desired − current`.
    pub fn between(current: &Graph, desired: &Graph) -> Self {
        let delete = current.iter().filter(|t| !desired.contains(t)).cloned().collect();
        let insert = desired.iter().filter(|t| !current.contains(t)).cloned().collect();
        Self { insert, delete }
    }

    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.delete.is_empty()
    }

    pub fn insert(&self) -> &BTreeSet<Triple> {
        &self.insert
    }

    pub fn delete(&self) -> &BTreeSet<Triple> {
        &self.delete
    }

    /// One update deleting then inserting, both in `graph`.
    pub fn to_update(&self, graph: &GraphName) -> Update {
        Update::new()
            .delete(graph, self.delete.iter().cloned())
            .insert(graph, self.insert.iter().cloned())
    }

    /// Apply to a local graph.
    pub fn apply_to(&self, graph: &mut Graph) {
        for t in &self.delete {
            graph.remove(t);
        }
        graph.extend(self.insert.iter().cloned());
    }
}

/// Write `patch` to the live graph in a single update. An empty patch
/// touches nothing and returns `None`.
pub async fn apply_patch<S: TripleStore + ?Sized>(store: &S, patch: &Patch) -> Result<Option<UpdateStats>> {
    if patch.is_empty() {
        tracing::debug!("instance unchanged, no update issued");
        return Ok(None);
    }
    tracing::debug!(insert = patch.insert.len(), delete = patch.delete.len(), "applying instance patch");
    let stats = store.update(&patch.to_update(&GraphName::Default)).await?;
    Ok(Some(stats))
}
