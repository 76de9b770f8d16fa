//! Access checks that gate history reads.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::vocab::{activity, mu, rdf};
use crate::model::*;
use crate::store::{TriplePattern, TripleStore};
use crate::Result;

/// Can the caller see the live instance?
///
/// History has no access rules of its own: a version is readable exactly
/// when the instance it belongs to is.
#[async_trait]
pub trait AccessCheck: Send + Sync {
    async fn can_access_instance(&self, uri: &Iri) -> Result<bool>;

    async fn can_access_instance_id(&self, id: &str) -> Result<bool>;
}

/// Visibility in the live graph of a store. An instance is visible when
/// it is typed with anything other than `as:Tombstone` (by URI) or when
/// something carries its `mu:uuid` (by id).
pub struct StoreVisibility<S: TripleStore> {
    store: Arc<S>,
}

impl<S: TripleStore> StoreVisibility<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: TripleStore> AccessCheck for StoreVisibility<S> {
    async fn can_access_instance(&self, uri: &Iri) -> Result<bool> {
        let pattern = TriplePattern::any().subject(uri).predicate(rdf::TYPE);
        let types = self.store.construct(&crate::store::Query::pattern(pattern)).await?;
        let tombstone = Term::iri(activity::TOMBSTONE);
        Ok(types.iter().any(|t| t.object != tombstone))
    }

    async fn can_access_instance_id(&self, id: &str) -> Result<bool> {
        let pattern = TriplePattern::any().predicate(mu::UUID).object(Term::literal(id));
        self.store.ask(&GraphName::Default, &pattern).await
    }
}

/// Grants everything.
pub struct AllowAll;

#[async_trait]
impl AccessCheck for AllowAll {
    async fn can_access_instance(&self, _uri: &Iri) -> Result<bool> {
        Ok(true)
    }

    async fn can_access_instance_id(&self, _id: &str) -> Result<bool> {
        Ok(true)
    }
}
