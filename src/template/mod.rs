//! # Form Templates
//!
//! A template is a graph describing a form: its root node (`form:Form`,
//! or an extension pointing at a base through `ext:extendsForm`), the
//! fields and listings it includes, and the instance metadata the
//! service needs (`form:targetType`, `form:targetLabel`, `ext:prefix`).
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `merge` | base + extension → derived template |
//! | `registry` | resolution by id or URI, extension chains, caches |
//! | `source` | where raw template documents come from |

pub mod merge;
pub mod registry;
pub mod source;

use serde::Serialize;

use crate::model::vocab::{ext, form, mu};
use crate::model::*;
use crate::{turtle, Error, Result};

pub use merge::merge_extension;
pub use registry::TemplateRegistry;
pub use source::{StoreTemplateSource, TemplateSource};

// ============================================================================
// TemplateGraph
// ============================================================================

/// A parsed template with its root located.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateGraph {
    graph: Graph,
    root: Iri,
}

impl TemplateGraph {
    pub fn parse(document: &str) -> Result<Self> {
        Self::from_graph(turtle::parse(document)?)
    }

    /// Locate the root: the node carrying `ext:extendsForm` (or typed
    /// `form:Extension`), otherwise the one `form:Form` that is not the
    /// sub-form of a listing.
    pub fn from_graph(graph: Graph) -> Result<Self> {
        let extends = Iri::new(ext::EXTENDS_FORM);
        let mut extension_roots = graph.subjects(&extends, None);
        for node in graph.instances_of(form::EXTENSION) {
            if !extension_roots.contains(&node) {
                extension_roots.push(node);
            }
        }

        let root = match extension_roots.as_slice() {
            [one] => one.as_iri().cloned(),
            [] => {
                let each = Iri::new(form::EACH);
                let candidates: Vec<&Term> = graph
                    .instances_of(form::FORM)
                    .into_iter()
                    .filter(|f| graph.triples_matching(None, Some(&each), Some(*f)).next().is_none())
                    .collect();
                match candidates.as_slice() {
                    [one] => one.as_iri().cloned(),
                    [] => return Err(Error::InvalidTemplate("no form:Form root node".into())),
                    _ => return Err(Error::InvalidTemplate(format!("{} candidate form:Form roots", candidates.len()))),
                }
            }
            _ => return Err(Error::InvalidTemplate("more than one extension root".into())),
        };

        let root = root.ok_or_else(|| Error::InvalidTemplate("template root must be an IRI".into()))?;
        Ok(Self { graph, root })
    }

    pub(crate) fn from_parts(graph: Graph, root: Iri) -> Self {
        Self { graph, root }
    }

    pub fn root(&self) -> &Iri {
        &self.root
    }

    pub fn root_term(&self) -> Term {
        Term::Iri(self.root.clone())
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    fn root_object(&self, predicate: &str) -> Option<&Term> {
        self.graph.object(&self.root_term(), &Iri::new(predicate))
    }

    /// URI of the template this one extends.
    pub fn base_uri(&self) -> Option<Iri> {
        self.root_object(ext::EXTENDS_FORM).and_then(Term::as_iri).cloned()
    }

    pub fn is_extension(&self) -> bool {
        self.base_uri().is_some()
    }

    /// The root's `mu:uuid`.
    pub fn id(&self) -> Option<String> {
        self.root_object(mu::UUID).and_then(Term::as_literal).map(|l| l.value().to_string())
    }

    pub fn target_type(&self) -> Option<Iri> {
        self.root_object(form::TARGET_TYPE).and_then(Term::as_iri).cloned()
    }

    pub fn target_label(&self) -> Option<Iri> {
        self.root_object(form::TARGET_LABEL).and_then(Term::as_iri).cloned()
    }

    /// Namespace for minted instance URIs.
    pub fn prefix(&self) -> Option<String> {
        self.root_object(ext::PREFIX).map(|t| match t {
            Term::Iri(iri) => iri.as_str().to_string(),
            Term::Literal(lit) => lit.value().to_string(),
            Term::BlankNode(b) => b.label().to_string(),
        })
    }

    /// Concept schemes referenced by `conceptScheme` in any `form:options`
    /// JSON literal, sorted and deduplicated.
    pub fn concept_schemes(&self) -> Vec<Iri> {
        let options = Iri::new(form::OPTIONS);
        let mut schemes: Vec<Iri> = self
            .graph
            .triples_matching(None, Some(&options), None)
            .filter_map(|t| t.object.as_literal())
            .filter_map(|lit| serde_json::from_str::<serde_json::Value>(lit.value()).ok())
            .filter_map(|json| json.get("conceptScheme").and_then(|v| v.as_str()).map(Iri::from))
            .collect();
        schemes.sort();
        schemes.dedup();
        schemes
    }

    /// The extraction plan for instances of this template.
    pub fn shape(&self) -> Result<Shape> {
        Shape::from_form(&self.graph, &self.root_term())
    }

    pub fn to_turtle(&self) -> Result<String> {
        turtle::serialize(&self.graph)
    }
}

// ============================================================================
// FormDefinition
// ============================================================================

/// A resolved template as handed to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    pub id: String,
    pub uri: Iri,
    pub form_ttl: String,
    /// Configured meta document plus concept-scheme data, if any.
    pub meta_ttl: Option<String>,
    pub prefix: Option<String>,
    #[serde(skip)]
    pub template: TemplateGraph,
    #[serde(skip)]
    pub shape: Shape,
}

impl FormDefinition {
    pub fn target_type(&self) -> Option<Iri> {
        self.template.target_type()
    }

    pub fn target_label(&self) -> Option<Iri> {
        self.template.target_label()
    }

    pub fn root(&self) -> &Iri {
        self.template.root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
        @prefix form: <http://lblod.data.gift/vocabularies/forms/> .
        @prefix ext: <http://mu.semte.ch/vocabularies/ext/> .
        @prefix mu: <http://mu.semte.ch/vocabularies/core/> .
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://ex.org/> .

        ex:form a form:Form ;
            mu:uuid "base-id" ;
            form:targetType ex:Thing ;
            form:targetLabel ex:name ;
            ext:prefix "http://data.ex.org/things/" ;
            form:includes ex:nameField, ex:list .
        ex:nameField sh:path ex:name ;
            form:options """{"conceptScheme":"http://ex.org/schemes/colors"}""" .
        ex:list a form:Listing ; form:scope [ sh:path ex:part ] ; form:each ex:partForm .
        ex:partForm a form:Form ; form:includes ex:partName .
        ex:partName sh:path ex:name .
    "#;

    #[test]
    fn test_root_skips_listing_sub_forms() {
        let t = TemplateGraph::parse(BASE).unwrap();
        assert_eq!(t.root().as_str(), "http://ex.org/form");
        assert!(!t.is_extension());
        assert_eq!(t.id().as_deref(), Some("base-id"));
        assert_eq!(t.target_type().unwrap().as_str(), "http://ex.org/Thing");
        assert_eq!(t.prefix().as_deref(), Some("http://data.ex.org/things/"));
        assert_eq!(t.concept_schemes(), vec![Iri::new("http://ex.org/schemes/colors")]);
    }

    #[test]
    fn test_extension_root() {
        let t = TemplateGraph::parse(
            r#"@prefix ext: <http://mu.semte.ch/vocabularies/ext/> .
               @prefix form: <http://lblod.data.gift/vocabularies/forms/> .
               <http://ex.org/ext> a form:Extension ; ext:extendsForm <http://ex.org/form> ."#,
        )
        .unwrap();
        assert!(t.is_extension());
        assert_eq!(t.base_uri().unwrap().as_str(), "http://ex.org/form");
    }

    #[test]
    fn test_no_root_is_invalid() {
        let err = TemplateGraph::parse("<http://ex.org/a> <http://ex.org/p> \"x\" .").unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
    }

    #[test]
    fn test_definition_serializes_camel_case() {
        let template = TemplateGraph::parse(BASE).unwrap();
        let def = FormDefinition {
            id: "base-id".into(),
            uri: template.root().clone(),
            form_ttl: "ttl".into(),
            meta_ttl: None,
            prefix: template.prefix(),
            shape: template.shape().unwrap(),
            template,
        };
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["formTtl"], "ttl");
        assert!(json["metaTtl"].is_null());
        assert_eq!(json["uri"], "http://ex.org/form");
        assert!(json.get("template").is_none());
    }
}
