//! # formgraph — Form Templates, Instances and History over a Triple Store
//!
//! Forms are described by RDF templates; the data users fill in is stored
//! as RDF next to everything else in a triple store. This crate is the
//! engine between the two.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `TripleStore` is the contract between engine and storage
//! 2. **Shape-scoped**: an instance is exactly what its template's shape reaches
//! 3. **Minimal writes**: updates are diffs; an unchanged instance costs no write
//! 4. **Nothing is lost**: deletes leave tombstones, versions are immutable
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formgraph::{FormEngine, Iri, turtle};
//!
//! # async fn example() -> formgraph::Result<()> {
//! let engine = FormEngine::open_memory().await?;
//! engine.register_template("person", "...form document...", None)?;
//!
//! let uri = engine.new_instance_uri("person").await?;
//! let content = turtle::parse(&format!("<{}> <http://xmlns.com/foaf/0.1/name> \"Ada\" .", uri.as_str()))?;
//! let created = engine.create_instance("person", &uri, &content).await?;
//! println!("{}", created.form_instance_ttl);
//!
//! engine.save_instance_version("person", &created.id, &Iri::new("http://ex.org/users/ada"), Some("first")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Stores
//!
//! | Store | Feature | Description |
//! |-------|---------|-------------|
//! | Memory | (default) | In-memory quads for testing/embedding |
//! | SPARQL | `sparql` | Remote SPARQL 1.1 query/update endpoint |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod turtle;
pub mod store;
pub mod template;
pub mod instance;
pub mod history;
pub mod config;

use std::sync::Arc;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Iri, BlankNode, Literal, LiteralKind, Term,
    Triple, Quad, GraphName, Graph,
    PropertyPath, Shape,
};

// ============================================================================
// Re-exports: Store, templates, instances, history
// ============================================================================

pub use store::{TripleStore, BackendConfig, MemoryStore, Query, Update, UpdateStats, TriplePattern};
pub use template::{FormDefinition, TemplateGraph, TemplateRegistry, TemplateSource, StoreTemplateSource};
pub use instance::{Instance, InstancePage, InstanceSummary, Page, Patch};
pub use history::{AccessCheck, StoreVisibility, History, VersionPage, VersionSummary};
pub use config::FormsConfig;

// ============================================================================
// Top-level engine handle
// ============================================================================

/// The primary entry point. A `FormEngine` wraps a triple store together
/// with the template registry and the collaborators that decide where
/// templates come from and who may read history.
pub struct FormEngine<S: TripleStore> {
    store: Arc<S>,
    templates: TemplateRegistry,
    source: Arc<dyn TemplateSource>,
    access: Arc<dyn AccessCheck>,
    config: FormsConfig,
}

impl<S: TripleStore> FormEngine<S> {
    /// Create an engine over `store`. Templates not registered up front are
    /// read from the store; history is gated by live-graph visibility.
    pub fn with_store(store: S) -> Self {
        let store = Arc::new(store);
        Self {
            source: Arc::new(StoreTemplateSource::new(store.clone())),
            access: Arc::new(StoreVisibility::new(store.clone())),
            templates: TemplateRegistry::new(),
            config: FormsConfig::default(),
            store,
        }
    }

    pub fn with_config(mut self, config: FormsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_template_source(mut self, source: Arc<dyn TemplateSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_access_check(mut self, access: Arc<dyn AccessCheck>) -> Self {
        self.access = access;
        self
    }

    /// Access the underlying store (for advanced use).
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FormsConfig {
        &self.config
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    // ========================================================================
    // Templates
    // ========================================================================

    /// Preload a template, the way a forms directory would.
    pub fn register_template(&self, id: &str, form_ttl: &str, meta_ttl: Option<&str>) -> Result<()> {
        self.templates.register(id, form_ttl, meta_ttl.map(str::to_string))
    }

    /// Forget every derived template.
    pub fn reset_template_caches(&self) {
        self.templates.reset();
    }

    #[tracing::instrument(skip(self), fields(store = self.store.name()))]
    pub async fn template(&self, id: &str) -> Result<Arc<FormDefinition>> {
        self.templates.resolve_by_id(id, self.source.as_ref(), self.store.as_ref()).await
    }

    #[tracing::instrument(skip(self, uri), fields(uri = %uri))]
    pub async fn template_by_uri(&self, uri: &Iri) -> Result<Arc<FormDefinition>> {
        self.templates.resolve_by_uri(uri, self.source.as_ref(), self.store.as_ref()).await
    }

    // ========================================================================
    // Instances
    // ========================================================================

    pub async fn instance(&self, form_id: &str, instance_id: &str) -> Result<Instance> {
        let form = self.template(form_id).await?;
        instance::fetch_instance(self.store.as_ref(), &form, instance_id).await
    }

    /// A fresh URI under the template's `ext:prefix`.
    pub async fn new_instance_uri(&self, form_id: &str) -> Result<Iri> {
        let form = self.template(form_id).await?;
        instance::new_instance_uri(&form)
    }

    /// Store validated `content` as a new instance rooted at `uri`.
    #[tracing::instrument(skip(self, uri, content), fields(uri = %uri))]
    pub async fn create_instance(&self, form_id: &str, uri: &Iri, content: &Graph) -> Result<Instance> {
        let form = self.template(form_id).await?;
        instance::create_instance(self.store.as_ref(), &form, uri, content).await
    }

    /// Bring an instance in line with validated `content`. Unchanged
    /// content issues no write.
    #[tracing::instrument(skip(self, content))]
    pub async fn update_instance(&self, form_id: &str, instance_id: &str, content: &Graph) -> Result<Instance> {
        let form = self.template(form_id).await?;
        instance::update_instance(self.store.as_ref(), &form, instance_id, content).await
    }

    /// Replace an instance with tombstones.
    #[tracing::instrument(skip(self))]
    pub async fn delete_instance(&self, form_id: &str, instance_id: &str) -> Result<UpdateStats> {
        let form = self.template(form_id).await?;
        let uri = instance::instance_uri_for_id(self.store.as_ref(), instance_id)
            .await?
            .ok_or_else(|| Error::InstanceNotFound(instance_id.to_string()))?;
        instance::delete_instance(self.store.as_ref(), &form, &uri).await
    }

    /// Instances of the template's target type; the configured page size
    /// when `page` is `None`.
    pub async fn list_instances(&self, form_id: &str, page: Option<Page>) -> Result<InstancePage> {
        let form = self.template(form_id).await?;
        let page = page.unwrap_or_else(|| self.config.default_page());
        instance::list_instances(self.store.as_ref(), &form, page).await
    }

    // ========================================================================
    // History
    // ========================================================================

    pub fn history(&self) -> History<'_, S> {
        History::new(self.store.as_ref(), self.access.as_ref(), &self.config)
    }

    /// Snapshot the instance as it is stored right now.
    #[tracing::instrument(skip(self))]
    pub async fn save_instance_version(
        &self,
        form_id: &str,
        instance_id: &str,
        creator: &Iri,
        description: Option<&str>,
    ) -> Result<()> {
        let current = self.instance(form_id, instance_id).await?;
        self.history().save_version(&current.uri, &current.graph, creator, description).await
    }
}

/// In-memory engine for testing and embedding.
impl FormEngine<MemoryStore> {
    pub async fn open_memory() -> Result<Self> {
        Ok(Self::with_store(MemoryStore::new()))
    }
}

/// Engine over a remote SPARQL endpoint.
#[cfg(feature = "sparql")]
impl FormEngine<store::SparqlStore> {
    pub fn open_sparql(config: FormsConfig) -> Result<Self> {
        let endpoint = match &config.backend {
            BackendConfig::Sparql(endpoint) => endpoint.clone(),
            BackendConfig::Memory => {
                return Err(Error::Config("backend is not a SPARQL endpoint".into()));
            }
        };
        Ok(Self::with_store(store::SparqlStore::new(endpoint)?).with_config(config))
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error at line {line}, column {column}: {message}")]
    ParseError { line: usize, column: usize, message: String },

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Template chain of {template} is broken: {reason}")]
    TemplateChainError { template: String, reason: String },

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors a caller reports as "not found". A broken extension chain
    /// counts: the template cannot be produced.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::TemplateNotFound(_) | Error::InstanceNotFound(_) | Error::TemplateChainError { .. }
        )
    }

    /// Errors worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreError(_) | Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
