//! # Form Instances
//!
//! An instance is the part of the live graph a template's shape reaches
//! from one root resource. Reads extract it, updates go through the diff
//! engine, deletes through the tombstone engine.

pub mod diff;
pub mod tombstone;

use serde::{Deserialize, Serialize};

use crate::model::vocab::{mu, rdf};
use crate::model::*;
use crate::store::{Query, SubjectSelector, TriplePattern, TripleStore};
use crate::template::FormDefinition;
use crate::{turtle, Error, Result};

pub use diff::{apply_patch, Patch};
pub use tombstone::delete_instance;

// ============================================================================
// Types
// ============================================================================

/// An extracted instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub uri: Iri,
    pub id: String,
    #[serde(skip)]
    pub graph: Graph,
    /// The graph as a document, `xsd:` header included.
    pub form_instance_ttl: String,
}

impl Instance {
    fn new(uri: Iri, id: String, graph: Graph) -> Result<Self> {
        let form_instance_ttl = turtle::serialize(&graph)?;
        Ok(Self { uri, id, graph, form_instance_ttl })
    }
}

/// One row of an instance listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub uri: Iri,
    pub id: String,
    /// Value of the template's `form:targetLabel`, if the instance has one.
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstancePage {
    pub instances: Vec<InstanceSummary>,
    /// Total matching instances, regardless of paging.
    pub count: usize,
}

/// Limit/offset paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: 20, offset: 0 }
    }
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// The resource whose `mu:uuid` is `id`.
pub async fn instance_uri_for_id<S: TripleStore + ?Sized>(store: &S, id: &str) -> Result<Option<Iri>> {
    let pattern = TriplePattern::any().predicate(mu::UUID).object(Term::literal(id));
    let found = store.construct(&Query::pattern(pattern)).await?;
    let mut uris: Vec<Iri> = found.into_iter().filter_map(|t| t.subject.as_iri().cloned()).collect();
    uris.sort();
    Ok(uris.into_iter().next())
}

/// The `mu:uuid` of `uri`.
pub async fn instance_id_for_uri<S: TripleStore + ?Sized>(store: &S, uri: &Iri) -> Result<Option<String>> {
    let pattern = TriplePattern::any().subject(uri).predicate(mu::UUID);
    let mut ids: Vec<String> = store
        .construct(&Query::pattern(pattern))
        .await?
        .into_iter()
        .filter_map(|t| t.object.as_literal().map(|l| l.value().to_string()))
        .collect();
    ids.sort();
    Ok(ids.into_iter().next())
}

// ============================================================================
// Reads
// ============================================================================

/// What `definition`'s shape reaches from `uri` in the live graph.
pub async fn extract<S: TripleStore + ?Sized>(store: &S, definition: &FormDefinition, uri: &Iri) -> Result<Graph> {
    let query = Query::Shape {
        graph: GraphName::Default,
        root: Term::Iri(uri.clone()),
        shape: definition.shape.clone(),
    };
    let mut graph = store.construct_graph(&query).await?;
    graph.merge_prefixes(definition.template.graph());
    Ok(graph)
}

/// The instance identified by `id`, read through `definition`.
pub async fn fetch_instance<S: TripleStore + ?Sized>(
    store: &S,
    definition: &FormDefinition,
    id: &str,
) -> Result<Instance> {
    let uri = instance_uri_for_id(store, id)
        .await?
        .ok_or_else(|| Error::InstanceNotFound(id.to_string()))?;
    let graph = extract(store, definition, &uri).await?;
    if graph.is_empty() {
        return Err(Error::InstanceNotFound(id.to_string()));
    }
    Instance::new(uri, id.to_string(), graph)
}

/// Instances of the template's target type carrying a `mu:uuid`, ordered
/// by URI.
pub async fn list_instances<S: TripleStore + ?Sized>(
    store: &S,
    definition: &FormDefinition,
    page: Page,
) -> Result<InstancePage> {
    let Some(target_type) = definition.target_type() else {
        return Ok(InstancePage::default());
    };

    let mut predicates = vec![Iri::new(mu::UUID)];
    if let Some(label) = definition.target_label() {
        predicates.push(label);
    }
    let query = Query::Describe {
        graph: GraphName::Default,
        subjects: SubjectSelector::Matching {
            predicate: Iri::new(rdf::TYPE),
            objects: vec![Term::Iri(target_type)],
        },
        predicates,
    };
    let found = store.construct_graph(&query).await?;

    let id_predicate = Iri::new(mu::UUID);
    let label = definition.target_label();
    let mut rows: Vec<InstanceSummary> = found
        .subjects(&id_predicate, None)
        .into_iter()
        .filter_map(|subject| {
            let uri = subject.as_iri()?.clone();
            let id = found.object(subject, &id_predicate)?.as_literal()?.value().to_string();
            let label = label
                .as_ref()
                .and_then(|l| found.object(subject, l))
                .map(|t| match t {
                    Term::Literal(lit) => lit.value().to_string(),
                    other => other.to_string(),
                });
            Some(InstanceSummary { uri, id, label })
        })
        .collect();
    rows.sort_by(|a, b| a.uri.cmp(&b.uri));

    let count = rows.len();
    Ok(InstancePage { instances: page.apply(rows), count })
}

// ============================================================================
// Writes
// ============================================================================

/// A fresh `<ext:prefix><uuid>` for a new instance.
pub fn new_instance_uri(definition: &FormDefinition) -> Result<Iri> {
    let prefix = definition
        .prefix
        .as_deref()
        .ok_or_else(|| Error::InvalidTemplate(format!("template {} has no ext:prefix", definition.id)))?;
    Ok(Iri::new(format!("{prefix}{}", uuid::Uuid::new_v4())))
}

/// Restrict `content` to the shape and make sure the root carries its
/// identity: `current` identity triples win, then any in `content`, then
/// the template's target type and a fresh uuid.
fn desired_graph(definition: &FormDefinition, uri: &Iri, content: &Graph, current: Option<&Graph>) -> Graph {
    let root = Term::Iri(uri.clone());
    let mut desired = Graph::from_triples(definition.shape.extract(content, &root));
    desired.merge_prefixes(content);

    let rdf_type = Iri::new(rdf::TYPE);
    let id_predicate = Iri::new(mu::UUID);
    if let Some(current) = current {
        for predicate in [&rdf_type, &id_predicate] {
            desired.remove_matching(Some(&root), Some(predicate), None);
            desired.extend(current.triples_matching(Some(&root), Some(predicate), None).cloned());
        }
        return desired;
    }

    if desired.object(&root, &rdf_type).is_none() {
        if let Some(target_type) = definition.target_type() {
            desired.insert(Triple::new(root.clone(), rdf_type, target_type));
        }
    }
    if desired.object(&root, &id_predicate).is_none() {
        desired.insert(Triple::new(root, id_predicate, Term::literal(uuid::Uuid::new_v4().to_string())));
    }
    desired
}

/// Insert validated `content` as a new instance rooted at `uri` in one
/// update, then read it back.
pub async fn create_instance<S: TripleStore + ?Sized>(
    store: &S,
    definition: &FormDefinition,
    uri: &Iri,
    content: &Graph,
) -> Result<Instance> {
    let desired = desired_graph(definition, uri, content, None);
    let id = desired
        .object(&Term::Iri(uri.clone()), &Iri::new(mu::UUID))
        .and_then(Term::as_literal)
        .map(|l| l.value().to_string())
        .ok_or_else(|| Error::InvalidTemplate("new instance has no identifier".into()))?;

    let update = crate::store::Update::new().insert(&GraphName::Default, desired);
    store.update(&update).await?;
    tracing::info!(instance = %uri, id = %id, "instance created");
    fetch_instance(store, definition, &id).await
}

/// Bring the stored instance `id` in line with validated `content`.
///
/// An unchanged instance is returned as is, with no store write.
/// Otherwise exactly one update is issued and the instance re-read. The
/// root's `rdf:type` and `mu:uuid` cannot be changed this way.
pub async fn update_instance<S: TripleStore + ?Sized>(
    store: &S,
    definition: &FormDefinition,
    id: &str,
    content: &Graph,
) -> Result<Instance> {
    let current = fetch_instance(store, definition, id).await?;
    let desired = desired_graph(definition, &current.uri, content, Some(&current.graph));
    let patch = Patch::between(&current.graph, &desired);
    if apply_patch(store, &patch).await?.is_none() {
        return Ok(current);
    }
    fetch_instance(store, definition, id).await
}
