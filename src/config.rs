//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::instance::Page;
use crate::model::Iri;
use crate::store::BackendConfig;
use crate::{Error, Result};

/// Graph names and defaults. Every field has a default, so a partial
/// JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    /// Shared graph holding version metadata.
    pub history_graph: Iri,
    /// Version snapshot graphs are minted as `<history_graph_base>/<uuid>`.
    pub history_graph_base: String,
    pub default_page_size: usize,
    pub backend: BackendConfig,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            history_graph: Iri::new("http://mu.semte.ch/graphs/formHistory"),
            history_graph_base: "http://mu.semte.ch/graphs/formHistory".into(),
            default_page_size: 20,
            backend: BackendConfig::Memory,
        }
    }
}

impl FormsConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// First page at the configured size.
    pub fn default_page(&self) -> Page {
        Page::new(self.default_page_size, 0)
    }
}
