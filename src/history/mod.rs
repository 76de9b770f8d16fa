//! # Instance History
//!
//! Every saved version is a verbatim copy of the instance graph in its own
//! named graph `<history base>/<uuid>`. A metadata record in the shared
//! history graph links it to the instance:
//!
//! ```text
//! <version> a ext:FormHistory ;
//!     dct:isVersionOf <instance> ;
//!     dct:issued "…"^^xsd:dateTime ;
//!     dct:creator <user> ;
//!     dct:description "…" .      # only when given
//! ```
//!
//! Versions are never changed or removed. Reads are gated by an
//! [`AccessCheck`] on the live instance; a denied read looks exactly like
//! an instance without history.

pub mod access;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FormsConfig;
use crate::instance::{instance_uri_for_id, Page};
use crate::model::vocab::{dct, ext, mu, rdf};
use crate::model::*;
use crate::store::{Query, SubjectSelector, TriplePattern, TripleStore, Update};
use crate::Result;

pub use access::{AccessCheck, AllowAll, StoreVisibility};

/// One saved version, as listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    /// The version's graph, which is also the metadata subject.
    pub uri: Iri,
    pub issued: DateTime<Utc>,
    pub creator: Iri,
    /// The creator's `mu:uuid`, when the live graph knows it.
    pub creator_id: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPage {
    pub versions: Vec<VersionSummary>,
    pub count: usize,
}

/// History operations over one store.
pub struct History<'a, S: TripleStore + ?Sized> {
    store: &'a S,
    access: &'a dyn AccessCheck,
    config: &'a FormsConfig,
}

impl<'a, S: TripleStore + ?Sized> History<'a, S> {
    pub fn new(store: &'a S, access: &'a dyn AccessCheck, config: &'a FormsConfig) -> Self {
        Self { store, access, config }
    }

    fn metadata_graph(&self) -> GraphName {
        GraphName::Named(self.config.history_graph.clone())
    }

    /// Record `graph` as a new version of `instance_uri`. Metadata and
    /// snapshot are written in one update.
    pub async fn save_version(
        &self,
        instance_uri: &Iri,
        graph: &Graph,
        creator: &Iri,
        description: Option<&str>,
    ) -> Result<()> {
        let version = Iri::new(format!(
            "{}/{}",
            self.config.history_graph_base.trim_end_matches('/'),
            uuid::Uuid::new_v4()
        ));

        let mut metadata = vec![
            Triple::new(&version, rdf::TYPE, Term::iri(ext::FORM_HISTORY)),
            Triple::new(&version, dct::IS_VERSION_OF, instance_uri),
            Triple::new(&version, dct::ISSUED, Literal::date_time(Utc::now())),
            Triple::new(&version, dct::CREATOR, creator),
        ];
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            metadata.push(Triple::new(&version, dct::DESCRIPTION, Term::literal(description)));
        }

        let update = Update::new()
            .insert(&self.metadata_graph(), metadata)
            .insert(&GraphName::Named(version.clone()), graph.iter().cloned());
        self.store.update(&update).await?;
        tracing::info!(instance = %instance_uri, version = %version, triples = graph.len(), "instance version saved");
        Ok(())
    }

    /// Every readable version of the instance `instance_id`, newest first.
    /// `None` when access is denied or the instance is unknown.
    ///
    /// Pages are cut in memory after all version records are read: a
    /// remote store answers one CONSTRUCT covering the instance's full history.
    async fn versions(&self, instance_id: &str) -> Result<Option<Vec<VersionSummary>>> {
        if !self.access.can_access_instance_id(instance_id).await? {
            tracing::debug!(instance_id, "history access denied");
            return Ok(None);
        }
        let Some(instance) = instance_uri_for_id(self.store, instance_id).await? else {
            return Ok(None);
        };

        let records = self
            .store
            .construct_graph(&Query::Describe {
                graph: self.metadata_graph(),
                subjects: SubjectSelector::Matching {
                    predicate: Iri::new(dct::IS_VERSION_OF),
                    objects: vec![Term::Iri(instance)],
                },
                predicates: Vec::new(),
            })
            .await?;

        let issued = Iri::new(dct::ISSUED);
        let creator = Iri::new(dct::CREATOR);
        let description = Iri::new(dct::DESCRIPTION);
        let mut partial = Vec::new();
        for subject in records.subjects(&Iri::new(dct::IS_VERSION_OF), None) {
            let Some(uri) = subject.as_iri() else { continue };
            let at = records
                .object(subject, &issued)
                .and_then(Term::as_literal)
                .and_then(Literal::as_date_time);
            let by = records.object(subject, &creator).and_then(Term::as_iri);
            let (Some(at), Some(by)) = (at, by) else {
                tracing::warn!(version = %uri, "skipping history record without issued date or creator");
                continue;
            };
            let text = records
                .object(subject, &description)
                .and_then(Term::as_literal)
                .map(|l| l.value().to_string());
            partial.push((uri.clone(), at, by.clone(), text));
        }

        let creators = self.creator_ids(partial.iter().map(|(_, _, by, _)| by)).await?;
        let mut versions: Vec<VersionSummary> = partial
            .into_iter()
            .map(|(uri, issued, creator, description)| VersionSummary {
                creator_id: creators.object(&Term::Iri(creator.clone()), &Iri::new(mu::UUID))
                    .and_then(Term::as_literal)
                    .map(|l| l.value().to_string()),
                uri,
                issued,
                creator,
                description,
            })
            .collect();
        versions.sort_by(|a, b| b.issued.cmp(&a.issued).then_with(|| a.uri.cmp(&b.uri)));
        Ok(Some(versions))
    }

    /// `mu:uuid` of each creator, in one round trip.
    async fn creator_ids<'i>(&self, creators: impl Iterator<Item = &'i Iri>) -> Result<Graph> {
        let mut subjects: Vec<Term> = creators.map(|c| Term::Iri(c.clone())).collect();
        subjects.sort();
        subjects.dedup();
        if subjects.is_empty() {
            return Ok(Graph::new());
        }
        self.store
            .construct_graph(&Query::Describe {
                graph: GraphName::Default,
                subjects: SubjectSelector::Exactly(subjects),
                predicates: vec![Iri::new(mu::UUID)],
            })
            .await
    }

    /// One page of versions, newest first. Empty when access is denied.
    pub async fn list_versions(&self, instance_id: &str, page: Page) -> Result<Vec<VersionSummary>> {
        Ok(self.versions(instance_id).await?.map(|v| page.apply(v)).unwrap_or_default())
    }

    /// Number of versions. Zero when access is denied.
    pub async fn count_versions(&self, instance_id: &str) -> Result<usize> {
        Ok(self.versions(instance_id).await?.map_or(0, |v| v.len()))
    }

    /// A page of versions plus the total, from a single read.
    pub async fn versions_with_count(&self, instance_id: &str, page: Page) -> Result<VersionPage> {
        Ok(match self.versions(instance_id).await? {
            Some(all) => VersionPage { count: all.len(), versions: page.apply(all) },
            None => VersionPage::default(),
        })
    }

    /// The snapshot stored as `version`, if its instance is accessible.
    pub async fn get_version(&self, version: &Iri) -> Result<Option<Graph>> {
        let pattern = TriplePattern::any().subject(version).predicate(dct::IS_VERSION_OF);
        let links = self
            .store
            .construct(&Query::Pattern { graph: self.metadata_graph(), pattern })
            .await?;
        let Some(instance) = links.into_iter().find_map(|t| t.object.as_iri().cloned()) else {
            return Ok(None);
        };
        if !self.access.can_access_instance(&instance).await? {
            tracing::debug!(instance = %instance, "history access denied");
            return Ok(None);
        }

        let snapshot = self
            .store
            .construct_graph(&Query::Pattern {
                graph: GraphName::Named(version.clone()),
                pattern: TriplePattern::any(),
            })
            .await?;
        Ok(Some(snapshot))
    }

    /// Whether any version exists for `instance_id`. Not access-checked.
    pub async fn has_any_version(&self, instance_id: &str) -> Result<bool> {
        let Some(instance) = instance_uri_for_id(self.store, instance_id).await? else {
            return Ok(false);
        };
        let pattern = TriplePattern::any().predicate(dct::IS_VERSION_OF).object(instance);
        self.store.ask(&self.metadata_graph(), &pattern).await
    }
}
