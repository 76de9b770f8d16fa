//! Where raw template documents come from.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::vocab::{ext, mu, rdf};
use crate::model::*;
use crate::store::{Query, SubjectSelector, TripleStore};
use crate::Result;

/// Loads template documents that were not registered up front.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// The document of the template whose identifier is `id`.
    async fn template_by_id(&self, id: &str) -> Result<Option<String>>;

    /// The document of the template rooted at `uri`.
    async fn template_by_uri(&self, uri: &Iri) -> Result<Option<String>>;
}

/// Reads `ext:GeneratedForm` records (`mu:uuid`, `ext:ttlCode`) from the
/// live graph of a store.
pub struct StoreTemplateSource<S: TripleStore> {
    store: Arc<S>,
}

impl<S: TripleStore> StoreTemplateSource<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn ttl_code(&self, subjects: SubjectSelector) -> Result<Option<String>> {
        let query = Query::Describe {
            graph: GraphName::Default,
            subjects,
            predicates: vec![Iri::new(rdf::TYPE), Iri::new(ext::TTL_CODE)],
        };
        let found = self.store.construct_graph(&query).await?;
        let generated = found.instances_of(ext::GENERATED_FORM);
        let ttl_code = Iri::new(ext::TTL_CODE);
        Ok(generated
            .into_iter()
            .find_map(|form| found.object(form, &ttl_code))
            .and_then(Term::as_literal)
            .map(|lit| lit.value().to_string()))
    }
}

#[async_trait]
impl<S: TripleStore> TemplateSource for StoreTemplateSource<S> {
    async fn template_by_id(&self, id: &str) -> Result<Option<String>> {
        self.ttl_code(SubjectSelector::Matching {
            predicate: Iri::new(mu::UUID),
            objects: vec![Term::literal(id)],
        })
        .await
    }

    async fn template_by_uri(&self, uri: &Iri) -> Result<Option<String>> {
        self.ttl_code(SubjectSelector::Exactly(vec![Term::Iri(uri.clone())])).await
    }
}

/// A source that never finds anything.
pub struct NoSource;

#[async_trait]
impl TemplateSource for NoSource {
    async fn template_by_id(&self, _id: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn template_by_uri(&self, _uri: &Iri) -> Result<Option<String>> {
        Ok(None)
    }
}
