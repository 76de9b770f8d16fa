//! End-to-end tests for template resolution.
//!
//! Covers configured templates, extension merge precedence, multi-level
//! chains, cache reuse, broken chains, and templates stored in the live graph.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use formgraph::model::vocab::{ext, form, mu, rdf, sh};
use formgraph::template::merge_extension;
use formgraph::{Error, FormEngine, GraphName, Iri, TemplateGraph, TemplateSource, Term, Triple};
use pretty_assertions::assert_eq;

const PREFIXES: &str = r#"
    @prefix form: <http://lblod.data.gift/vocabularies/forms/> .
    @prefix ext: <http://mu.semte.ch/vocabularies/ext/> .
    @prefix mu: <http://mu.semte.ch/vocabularies/core/> .
    @prefix sh: <http://www.w3.org/ns/shacl#> .
    @prefix ex: <http://ex.org/> .
"#;

fn doc(body: &str) -> String {
    format!("{PREFIXES}\n{body}")
}

fn person_form() -> String {
    doc(r#"
        ex:personForm a form:Form ;
            mu:uuid "person" ;
            form:targetType ex:Person ;
            form:targetLabel ex:name ;
            ext:prefix "http://data.ex.org/people/" ;
            form:includes ex:nameField .
        ex:nameField sh:path ex:name .
    "#)
}

fn employee_form() -> String {
    doc(r#"
        ex:employeeForm a form:Extension ;
            ext:extendsForm ex:personForm ;
            mu:uuid "employee" ;
            form:targetType ex:Employee ;
            form:includes ex:roleField .
        ex:roleField sh:path ex:role .
    "#)
}

fn manager_form() -> String {
    doc(r#"
        ex:managerForm a form:Extension ;
            ext:extendsForm ex:employeeForm ;
            mu:uuid "manager" ;
            form:targetType ex:Manager ;
            ext:prefix "http://data.ex.org/managers/" ;
            form:includes ex:levelField .
        ex:levelField sh:path ex:level .
    "#)
}

// ============================================================================
// Helper: a template source that counts how often it is asked.
// ============================================================================

#[derive(Default)]
struct CountingSource {
    by_id: HashMap<String, String>,
    by_uri: HashMap<String, String>,
    loads: AtomicUsize,
}

impl CountingSource {
    fn with(mut self, id: &str, uri: &str, document: String) -> Self {
        self.by_id.insert(id.to_string(), document.clone());
        self.by_uri.insert(uri.to_string(), document);
        self
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemplateSource for CountingSource {
    async fn template_by_id(&self, id: &str) -> formgraph::Result<Option<String>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.by_id.get(id).cloned())
    }

    async fn template_by_uri(&self, uri: &Iri) -> formgraph::Result<Option<String>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.by_uri.get(uri.as_str()).cloned())
    }
}

fn chain_source() -> Arc<CountingSource> {
    Arc::new(
        CountingSource::default()
            .with("person", "http://ex.org/personForm", person_form())
            .with("employee", "http://ex.org/employeeForm", employee_form())
            .with("manager", "http://ex.org/managerForm", manager_form()),
    )
}

// ============================================================================
// 1. Configured templates
// ============================================================================

#[tokio::test]
async fn test_configured_template_resolves() {
    let engine = FormEngine::open_memory().await.unwrap();
    engine.register_template("person", &person_form(), Some("# meta")).unwrap();

    let def = engine.template("person").await.unwrap();
    assert_eq!(def.id, "person");
    assert_eq!(def.uri.as_str(), "http://ex.org/personForm");
    assert_eq!(def.prefix.as_deref(), Some("http://data.ex.org/people/"));
    assert_eq!(def.meta_ttl.as_deref(), Some("# meta"));
    assert_eq!(def.shape.fields.len(), 1);
    assert!(def.form_ttl.starts_with("@prefix xsd:"));

    let by_uri = engine.template_by_uri(&Iri::new("http://ex.org/personForm")).await.unwrap();
    assert!(Arc::ptr_eq(&def, &by_uri));
}

#[tokio::test]
async fn test_definition_serializes_camel_case() {
    let engine = FormEngine::open_memory().await.unwrap();
    engine.register_template("person", &person_form(), None).unwrap();
    let def = engine.template("person").await.unwrap();

    let json = serde_json::to_value(&*def).unwrap();
    assert_eq!(json["id"], "person");
    assert!(json["formTtl"].as_str().unwrap().contains("ex:personForm"));
    assert!(json.get("metaTtl").is_some());
    assert!(json.get("shape").is_none());
}

#[tokio::test]
async fn test_unknown_template() {
    let engine = FormEngine::open_memory().await.unwrap();
    let err = engine.template("nope").await.unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound(_)));
    assert!(err.is_not_found());
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_malformed_template_is_parse_error() {
    let engine = FormEngine::open_memory().await.unwrap();
    let err = engine.register_template("bad", "ex:a ex:b ex:c .", None).unwrap_err();
    assert!(matches!(err, Error::ParseError { .. }));
}

// ============================================================================
// 2. Merge precedence
// ============================================================================

#[test]
fn test_extension_overrides_instance_metadata() {
    let base = TemplateGraph::parse(&person_form()).unwrap();
    let extension = TemplateGraph::parse(&employee_form()).unwrap();
    let merged = merge_extension(&base, &extension).unwrap();

    assert_eq!(merged.root().as_str(), "http://ex.org/personForm");
    assert_eq!(merged.id().as_deref(), Some("employee"));
    assert_eq!(merged.target_type().unwrap().as_str(), "http://ex.org/Employee");
    let root = merged.root_term();
    let types: Vec<&Term> = merged.graph().objects(&root, &Iri::new(form::TARGET_TYPE)).collect();
    assert_eq!(types.len(), 1);
    let ids: Vec<&Term> = merged.graph().objects(&root, &Iri::new(mu::UUID)).collect();
    assert_eq!(ids.len(), 1);

    // The extension root is gone; everything it said now hangs off the base root.
    let ext_root = Term::iri("http://ex.org/employeeForm");
    assert_eq!(merged.graph().triples_matching(Some(&ext_root), None, None).count(), 0);
    assert!(merged.graph().contains(&Triple::new(root.clone(), form::INCLUDES, Term::iri("http://ex.org/roleField"))));
    assert!(merged.graph().contains(&Triple::new(root.clone(), form::INCLUDES, Term::iri("http://ex.org/nameField"))));
    assert!(merged.graph().contains(&Triple::new(root.clone(), rdf::TYPE, Term::iri(form::FORM))));
    assert!(!merged.graph().contains(&Triple::new(root, rdf::TYPE, Term::iri(form::EXTENSION))));
}

#[test]
fn test_merge_keeps_same_labelled_blank_nodes_apart() {
    let base = TemplateGraph::parse(&doc(r#"
        ex:f a form:Form ; form:includes ex:a .
        ex:a sh:path ex:a ; sh:order _:o .
        _:o ex:n 1 .
    "#))
    .unwrap();
    let extension = TemplateGraph::parse(&doc(r#"
        ex:g a form:Extension ; ext:extendsForm ex:f ; form:includes ex:b .
        ex:b sh:path ex:b ; sh:order _:o .
        _:o ex:n 2 .
    "#))
    .unwrap();
    let merged = merge_extension(&base, &extension).unwrap();

    let sh_order = Iri::new("http://www.w3.org/ns/shacl#order");
    let n = Iri::new("http://ex.org/n");
    let a_order = merged.graph().object(&Term::iri("http://ex.org/a"), &sh_order).unwrap();
    let b_order = merged.graph().object(&Term::iri("http://ex.org/b"), &sh_order).unwrap();
    assert_ne!(a_order, b_order);
    assert_eq!(merged.graph().object(a_order, &n).and_then(Term::as_literal).map(|l| l.value()), Some("1"));
    assert_eq!(merged.graph().object(b_order, &n).and_then(Term::as_literal).map(|l| l.value()), Some("2"));
}

#[test]
fn test_extends_group_points_fields_at_base_group() {
    let base = TemplateGraph::parse(&doc(r#"
        ex:f a form:Form ; form:includes ex:a .
        ex:a sh:path ex:a ; sh:group ex:main .
        ex:main a form:PropertyGroup .
    "#))
    .unwrap();
    let extension = TemplateGraph::parse(&doc(r#"
        ex:g a form:Extension ; ext:extendsForm ex:f ; form:includes ex:b .
        ex:b sh:path ex:b ; sh:group ex:extra .
        ex:extra a form:PropertyGroup ; ext:extendsGroup ex:main .
    "#))
    .unwrap();
    let merged = merge_extension(&base, &extension).unwrap();
    let group = merged.graph().object(&Term::iri("http://ex.org/b"), &Iri::new(sh::GROUP)).unwrap();
    assert_eq!(group, &Term::iri("http://ex.org/main"));
    assert!(merged.graph().subjects(&Iri::new(ext::EXTENDS_GROUP), None).is_empty());
}

// ============================================================================
// 3. Multi-level chains and cache reuse
// ============================================================================

#[tokio::test]
async fn test_three_level_chain() {
    let source = chain_source();
    let engine = FormEngine::open_memory().await.unwrap().with_template_source(source.clone());

    let manager = engine.template("manager").await.unwrap();
    assert_eq!(manager.id, "manager");
    assert_eq!(manager.uri.as_str(), "http://ex.org/personForm");
    assert_eq!(manager.target_type().unwrap().as_str(), "http://ex.org/Manager");
    assert_eq!(manager.prefix.as_deref(), Some("http://data.ex.org/managers/"));
    assert_eq!(manager.shape.fields.len(), 3);
    assert_eq!(source.loads(), 3);
}

#[tokio::test]
async fn test_chain_levels_are_cached() {
    let source = chain_source();
    let engine = FormEngine::open_memory().await.unwrap().with_template_source(source.clone());
    engine.template("manager").await.unwrap();
    let loads = source.loads();

    let employee = engine.template("employee").await.unwrap();
    assert_eq!(employee.target_type().unwrap().as_str(), "http://ex.org/Employee");
    assert_eq!(employee.shape.fields.len(), 2);
    let person = engine.template_by_uri(&Iri::new("http://ex.org/personForm")).await.unwrap();
    assert_eq!(person.id, "person");
    let again = engine.template_by_uri(&Iri::new("http://ex.org/managerForm")).await.unwrap();
    assert_eq!(again.id, "manager");
    assert_eq!(source.loads(), loads);

    engine.reset_template_caches();
    engine.template("employee").await.unwrap();
    assert!(source.loads() > loads);
}

#[tokio::test]
async fn test_chain_cycle_is_reported() {
    let source = Arc::new(
        CountingSource::default()
            .with("x", "http://ex.org/x", doc("ex:x a form:Extension ; ext:extendsForm ex:y ."))
            .with("y", "http://ex.org/y", doc("ex:y a form:Extension ; ext:extendsForm ex:x .")),
    );
    let engine = FormEngine::open_memory().await.unwrap().with_template_source(source);
    let err = engine.template("x").await.unwrap_err();
    assert!(matches!(err, Error::TemplateChainError { .. }));
}

#[tokio::test]
async fn test_missing_base_is_reported() {
    let source = Arc::new(CountingSource::default().with("employee", "http://ex.org/employeeForm", employee_form()));
    let engine = FormEngine::open_memory().await.unwrap().with_template_source(source);
    let err = engine.template("employee").await.unwrap_err();
    match err {
        Error::TemplateChainError { template, reason } => {
            assert_eq!(template, "employee");
            assert!(reason.contains("http://ex.org/personForm"));
        }
        other => panic!("expected chain error, got {other:?}"),
    }
}

// ============================================================================
// 4. Templates stored in the live graph
// ============================================================================

#[tokio::test]
async fn test_generated_form_read_from_store() {
    let engine = FormEngine::open_memory().await.unwrap();
    let record = Term::iri("http://ex.org/generated/1");
    engine.store().load(
        GraphName::Default,
        [
            Triple::new(record.clone(), rdf::TYPE, Term::iri(ext::GENERATED_FORM)),
            Triple::new(record.clone(), mu::UUID, Term::literal("stored")),
            Triple::new(record, ext::TTL_CODE, Term::literal(person_form())),
        ],
    );

    let def = engine.template("stored").await.unwrap();
    assert_eq!(def.id, "stored");
    assert_eq!(def.uri.as_str(), "http://ex.org/personForm");
}

#[tokio::test]
async fn test_concepts_are_appended_to_meta() {
    let engine = FormEngine::open_memory().await.unwrap();
    engine
        .register_template(
            "colors",
            &doc(r#"
                ex:f a form:Form ; form:includes ex:color .
                ex:color sh:path ex:color ;
                    form:options """{"conceptScheme":"http://ex.org/schemes/colors"}""" .
            "#),
            Some("@prefix ex: <http://ex.org/> ."),
        )
        .unwrap();
    engine.store().load(
        GraphName::Default,
        [
            Triple::new(Term::iri("http://ex.org/red"), "http://www.w3.org/2004/02/skos/core#inScheme", Term::iri("http://ex.org/schemes/colors")),
            Triple::new(Term::iri("http://ex.org/red"), "http://www.w3.org/2004/02/skos/core#prefLabel", Term::literal("Red")),
            Triple::new(Term::iri("http://ex.org/cat"), "http://www.w3.org/2004/02/skos/core#inScheme", Term::iri("http://ex.org/schemes/animals")),
        ],
    );

    let def = engine.template("colors").await.unwrap();
    let meta = def.meta_ttl.as_deref().unwrap();
    assert!(meta.starts_with("@prefix ex: <http://ex.org/> ."));
    assert!(meta.contains("\"Red\""));
    assert!(!meta.contains("http://ex.org/cat"));
}
