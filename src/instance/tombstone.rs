//! Logical deletion.
//!
//! Deleting an instance removes everything its template's shape attributes
//! to it and, in the same update, leaves an `as:Tombstone` for every typed
//! resource that went away. Relations from outside the shape that point
//! at the deleted resources are left as they are.

use chrono::{DateTime, Utc};

use crate::model::vocab::{activity, rdf};
use crate::model::*;
use crate::store::{TripleStore, Update, UpdateStats};
use crate::template::FormDefinition;
use crate::{Error, Result};

/// `(resource, type)` for every `rdf:type` triple on an IRI subject.
pub fn typed_resources(graph: &Graph) -> Vec<(Iri, Iri)> {
    let rdf_type = Iri::new(rdf::TYPE);
    graph
        .triples_matching(None, Some(&rdf_type), None)
        .filter_map(|t| Some((t.subject.as_iri()?.clone(), t.object.as_iri()?.clone())))
        .collect()
}

/// Tombstone records: one `a as:Tombstone` and `as:deleted` per resource,
/// one `as:formerType` per former type.
pub fn tombstone_triples(typed: &[(Iri, Iri)], deleted_at: DateTime<Utc>) -> Vec<Triple> {
    let deleted = Term::Literal(Literal::date_time(deleted_at));
    let mut out = Vec::with_capacity(typed.len() * 3);
    for (resource, former_type) in typed {
        out.push(Triple::new(resource.clone(), rdf::TYPE, Term::iri(activity::TOMBSTONE)));
        out.push(Triple::new(resource.clone(), activity::DELETED, deleted.clone()));
        out.push(Triple::new(resource.clone(), activity::FORMER_TYPE, former_type.clone()));
    }
    // Resources with several types yield repeated tombstone/deleted triples.
    out.sort();
    out.dedup();
    out
}

/// The single update that deletes `instance` (as extracted through
/// `shape`) and inserts its tombstones.
pub fn deletion_update(shape: &Shape, root: &Iri, instance: &Graph, deleted_at: DateTime<Utc>) -> Update {
    let typed = typed_resources(instance);
    Update::new()
        .delete_shape(GraphName::Default, Term::Iri(root.clone()), shape.clone())
        .insert(&GraphName::Default, tombstone_triples(&typed, deleted_at))
}

/// Delete the instance at `uri` through `definition`'s shape.
pub async fn delete_instance<S: TripleStore + ?Sized>(
    store: &S,
    definition: &FormDefinition,
    uri: &Iri,
) -> Result<UpdateStats> {
    let instance = super::extract(store, definition, uri).await?;
    if instance.is_empty() {
        return Err(Error::InstanceNotFound(uri.as_str().to_string()));
    }

    let update = deletion_update(&definition.shape, uri, &instance, Utc::now());
    let stats = store.update(&update).await?;
    tracing::info!(
        instance = %uri,
        tombstones = typed_resources(&instance).len(),
        deleted = stats.triples_deleted,
        "instance deleted"
    );
    Ok(stats)
}
