//! Template resolution and caching.
//!
//! Lookup order for an identifier: derived cache, configured templates,
//! then the [`TemplateSource`]. For a URI: the URI → id map, configured
//! templates, then the source. Extension chains are resolved bottom-up
//! and every level lands in the cache, so resolving `C → B → A` and later
//! `B` does no further loading or merging.
//!
//! Caches only grow. [`TemplateRegistry::reset`] is the one way to drop
//! derived entries (configured templates survive it).

use std::collections::BTreeSet;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::vocab::skos;
use crate::model::*;
use crate::store::{Query, SubjectSelector, TripleStore};
use crate::{turtle, Error, Result};
use super::{merge_extension, FormDefinition, TemplateGraph, TemplateSource};

/// A template registered up front.
#[derive(Debug, Clone)]
struct Configured {
    form_ttl: String,
    meta_ttl: Option<String>,
}

/// One level of an extension chain before folding.
struct Level {
    template: TemplateGraph,
    /// Identifier the level was requested under, if any.
    id: Option<String>,
    /// URI the level was requested under, if any.
    uri: Option<Iri>,
    meta_ttl: Option<String>,
}

/// Process-wide template cache.
#[derive(Default)]
pub struct TemplateRegistry {
    configured: RwLock<HashMap<String, Configured>>,
    configured_uris: RwLock<HashMap<Iri, String>>,
    definitions: RwLock<HashMap<String, Arc<FormDefinition>>>,
    uri_to_id: RwLock<HashMap<Iri, String>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a template under `id`. Its root URI maps to `id` as well.
    pub fn register(&self, id: impl Into<String>, form_ttl: impl Into<String>, meta_ttl: Option<String>) -> Result<()> {
        let id = id.into();
        let form_ttl = form_ttl.into();
        let root = TemplateGraph::parse(&form_ttl)?.root().clone();
        tracing::debug!(id = %id, root = %root, "registered template");
        self.configured_uris.write().insert(root, id.clone());
        self.configured.write().insert(id, Configured { form_ttl, meta_ttl });
        Ok(())
    }

    /// Identifiers of every configured template, sorted.
    pub fn configured_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.configured.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn cached(&self, id: &str) -> Option<Arc<FormDefinition>> {
        self.definitions.read().get(id).cloned()
    }

    pub fn cached_by_uri(&self, uri: &Iri) -> Option<Arc<FormDefinition>> {
        let id = self.uri_to_id.read().get(uri).cloned()?;
        self.cached(&id)
    }

    /// Drop every derived entry.
    pub fn reset(&self) {
        self.definitions.write().clear();
        self.uri_to_id.write().clear();
    }

    fn configured(&self, id: &str) -> Option<Configured> {
        self.configured.read().get(id).cloned()
    }

    fn configured_id_for(&self, uri: &Iri) -> Option<String> {
        self.configured_uris.read().get(uri).cloned()
    }

    /// Cache `definition` under its id and the URIs it is known by. A
    /// derived template is keyed by the extension's own root, never by
    /// the base root it now carries.
    fn remember(&self, definition: FormDefinition, own_root: Iri, uri: Option<&Iri>) -> Arc<FormDefinition> {
        let definition = Arc::new(definition);
        {
            let mut uris = self.uri_to_id.write();
            uris.insert(own_root, definition.id.clone());
            if let Some(uri) = uri {
                uris.insert(uri.clone(), definition.id.clone());
            }
        }
        self.definitions.write().insert(definition.id.clone(), definition.clone());
        definition
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve the template known as `id`, merging extension chains.
    pub async fn resolve_by_id(
        &self,
        id: &str,
        source: &dyn TemplateSource,
        store: &dyn TripleStore,
    ) -> Result<Arc<FormDefinition>> {
        if let Some(hit) = self.cached(id) {
            tracing::debug!(id, "template cache hit");
            return Ok(hit);
        }

        let (document, meta_ttl) = match self.configured(id) {
            Some(configured) => (configured.form_ttl, configured.meta_ttl),
            None => match source.template_by_id(id).await? {
                Some(document) => (document, None),
                None => return Err(Error::TemplateNotFound(id.to_string())),
            },
        };

        let top = Level {
            template: TemplateGraph::parse(&document)?,
            id: Some(id.to_string()),
            uri: None,
            meta_ttl,
        };
        self.resolve_chain(top, source, store).await
    }

    /// Resolve the template rooted at `uri`, merging extension chains.
    pub async fn resolve_by_uri(
        &self,
        uri: &Iri,
        source: &dyn TemplateSource,
        store: &dyn TripleStore,
    ) -> Result<Arc<FormDefinition>> {
        if let Some(hit) = self.cached_by_uri(uri) {
            tracing::debug!(uri = %uri, "template cache hit");
            return Ok(hit);
        }
        if let Some(id) = self.configured_id_for(uri) {
            return self.resolve_by_id(&id, source, store).await;
        }

        let document = source
            .template_by_uri(uri)
            .await?
            .ok_or_else(|| Error::TemplateNotFound(uri.as_str().to_string()))?;
        let top = Level {
            template: TemplateGraph::parse(&document)?,
            id: None,
            uri: Some(uri.clone()),
            meta_ttl: None,
        };
        self.resolve_chain(top, source, store).await
    }

    /// Walk `top`'s extension chain down to a plain (or already cached)
    /// template, then fold and cache each level on the way back up.
    async fn resolve_chain(
        &self,
        top: Level,
        source: &dyn TemplateSource,
        store: &dyn TripleStore,
    ) -> Result<Arc<FormDefinition>> {
        let name = top
            .id
            .clone()
            .or_else(|| top.uri.as_ref().map(|u| u.as_str().to_string()))
            .unwrap_or_else(|| top.template.root().as_str().to_string());
        let chain_error = |reason: String| Error::TemplateChainError { template: name.clone(), reason };

        let mut seen: BTreeSet<Iri> = BTreeSet::new();
        seen.insert(top.template.root().clone());
        let mut chain = vec![top];
        let mut bottom: Option<Arc<FormDefinition>> = None;

        while let Some(base_uri) = chain.last().and_then(|level| level.template.base_uri()) {
            if !seen.insert(base_uri.clone()) {
                return Err(chain_error(format!("cycle through {base_uri}")));
            }
            if let Some(hit) = self.cached_by_uri(&base_uri) {
                bottom = Some(hit);
                break;
            }

            let (document, id, meta_ttl) = match self.configured_id_for(&base_uri) {
                Some(id) => match self.configured(&id) {
                    Some(configured) => (configured.form_ttl, Some(id), configured.meta_ttl),
                    None => return Err(chain_error(format!("base {base_uri} is registered without a document"))),
                },
                None => match source.template_by_uri(&base_uri).await? {
                    Some(document) => (document, None, None),
                    None => return Err(chain_error(format!("base template {base_uri} not found"))),
                },
            };
            chain.push(Level {
                template: TemplateGraph::parse(&document)?,
                id,
                uri: Some(base_uri),
                meta_ttl,
            });
        }

        let mut current = match bottom {
            Some(cached) => cached,
            None => {
                // The loop only stops without a cache hit on a plain template.
                let level = chain.pop().ok_or_else(|| chain_error("empty extension chain".into()))?;
                self.finalize(level, None, store).await?
            }
        };

        while let Some(level) = chain.pop() {
            current = self.finalize(level, Some(&current.template), store).await?;
        }
        Ok(current)
    }

    /// Merge `level` into `base` (if any), attach metadata and cache it.
    async fn finalize(
        &self,
        level: Level,
        base: Option<&TemplateGraph>,
        store: &dyn TripleStore,
    ) -> Result<Arc<FormDefinition>> {
        let own_root = level.template.root().clone();
        let template = match base {
            Some(base) => merge_extension(base, &level.template)?,
            None => level.template,
        };

        let id = level
            .id
            .or_else(|| template.id())
            .or_else(|| level.uri.as_ref().map(|u| u.as_str().to_string()))
            .unwrap_or_else(|| template.root().as_str().to_string());

        let meta_ttl = self.meta_for(&template, level.meta_ttl, store).await?;
        let definition = FormDefinition {
            form_ttl: template.to_turtle()?,
            uri: template.root().clone(),
            prefix: template.prefix(),
            shape: template.shape()?,
            meta_ttl,
            id,
            template,
        };
        tracing::debug!(id = %definition.id, uri = %definition.uri, "template resolved");
        Ok(self.remember(definition, own_root, level.uri.as_ref()))
    }

    /// Configured meta document followed by the concepts of every
    /// referenced concept scheme, fetched in one round trip.
    async fn meta_for(
        &self,
        template: &TemplateGraph,
        configured: Option<String>,
        store: &dyn TripleStore,
    ) -> Result<Option<String>> {
        let schemes = template.concept_schemes();
        if schemes.is_empty() {
            return Ok(configured);
        }

        let query = Query::Describe {
            graph: GraphName::Default,
            subjects: SubjectSelector::Matching {
                predicate: Iri::new(skos::IN_SCHEME),
                objects: schemes.into_iter().map(Term::Iri).collect(),
            },
            predicates: Vec::new(),
        };
        let concepts = store.construct_graph(&query).await?;
        if concepts.is_empty() {
            return Ok(configured);
        }

        let concepts = turtle::serialize(&concepts)?;
        Ok(Some(match configured {
            Some(meta) => format!("{meta}\n{concepts}"),
            None => concepts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::template::source::NoSource;

    const BASE: &str = r#"
        @prefix form: <http://lblod.data.gift/vocabularies/forms/> .
        @prefix mu: <http://mu.semte.ch/vocabularies/core/> .
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        <http://ex.org/base> a form:Form ; mu:uuid "base" ;
            form:targetType <http://ex.org/Thing> ;
            form:includes <http://ex.org/f> .
        <http://ex.org/f> sh:path <http://ex.org/name> ;
            form:options """{"conceptScheme":"http://ex.org/colors"}""" .
    "#;

    const EXT: &str = r#"
        @prefix form: <http://lblod.data.gift/vocabularies/forms/> .
        @prefix ext: <http://mu.semte.ch/vocabularies/ext/> .
        @prefix mu: <http://mu.semte.ch/vocabularies/core/> .
        <http://ex.org/ext> a form:Extension ; ext:extendsForm <http://ex.org/base> ;
            mu:uuid "ext" ; form:targetType <http://ex.org/Special> .
    "#;

    #[tokio::test]
    async fn test_configured_extension_resolves_and_caches() {
        let registry = TemplateRegistry::new();
        registry.register("base", BASE, Some("# meta".into())).unwrap();
        registry.register("ext", EXT, None).unwrap();
        let store = MemoryStore::new();

        let def = registry.resolve_by_id("ext", &NoSource, &store).await.unwrap();
        assert_eq!(def.id, "ext");
        assert_eq!(def.uri.as_str(), "http://ex.org/base");
        assert_eq!(def.target_type().unwrap().as_str(), "http://ex.org/Special");
        assert!(registry.cached("base").is_some());
        assert!(registry.cached_by_uri(&Iri::new("http://ex.org/base")).is_some());
    }

    #[tokio::test]
    async fn test_meta_includes_concepts() {
        let registry = TemplateRegistry::new();
        registry.register("base", BASE, Some("# meta".into())).unwrap();
        let store = MemoryStore::new();
        store.load(
            GraphName::Default,
            [
                Triple::new(Term::iri("http://ex.org/red"), skos::IN_SCHEME, Term::iri("http://ex.org/colors")),
                Triple::new(Term::iri("http://ex.org/red"), "http://ex.org/label", Term::literal("red")),
            ],
        );
        let def = registry.resolve_by_id("base", &NoSource, &store).await.unwrap();
        let meta = def.meta_ttl.as_deref().unwrap();
        assert!(meta.starts_with("# meta\n"));
        assert!(meta.contains("\"red\""));
    }

    #[tokio::test]
    async fn test_missing_base_is_chain_error() {
        let registry = TemplateRegistry::new();
        registry.register("ext", EXT, None).unwrap();
        let err = registry.resolve_by_id("ext", &NoSource, &MemoryStore::new()).await.unwrap_err();
        assert!(matches!(err, Error::TemplateChainError { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let registry = TemplateRegistry::new();
        let err = registry.resolve_by_id("nope", &NoSource, &MemoryStore::new()).await.unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(_)));
    }

    #[tokio::test]
    async fn test_reset_keeps_configured() {
        let registry = TemplateRegistry::new();
        registry.register("base", BASE, None).unwrap();
        let store = MemoryStore::new();
        registry.resolve_by_id("base", &NoSource, &store).await.unwrap();
        registry.reset();
        assert!(registry.cached("base").is_none());
        assert_eq!(registry.configured_ids(), vec!["base".to_string()]);
        assert!(registry.resolve_by_id("base", &NoSource, &store).await.is_ok());
    }
}
