//! SPARQL 1.1 rendering and the HTTP store.
//!
//! Rendering is always available so queries can be logged or inspected;
//! the HTTP client behind it needs the `sparql` feature.
//!
//! Blank nodes cannot be addressed at a remote endpoint. Deleting a triple
//! that mentions one is rendered as a pattern with a variable in its place.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::model::vocab::{mu, rdf};
use crate::model::*;
use crate::turtle::{format_term, format_triple};
use crate::{Error, Result};
use super::{Query, ShapeDelete, SubjectSelector, TriplePattern, Update};

// ============================================================================
// Configuration
// ============================================================================

/// Where the SPARQL endpoint lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparqlConfig {
    pub query_endpoint: String,
    /// Defaults to `query_endpoint`.
    pub update_endpoint: Option<String>,
    pub timeout_ms: u64,
}

impl Default for SparqlConfig {
    fn default() -> Self {
        Self {
            query_endpoint: "http://localhost:8890/sparql".into(),
            update_endpoint: None,
            timeout_ms: 30_000,
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn term(t: &Term) -> Result<String> {
    if t.is_blank_node() {
        return Err(Error::StoreError(format!("blank node {t} cannot be addressed at a remote store")));
    }
    format_term(t)
}

fn iri(i: &Iri) -> Result<String> {
    format_term(&Term::Iri(i.clone()))
}

/// Term in a pattern position: blank nodes become variables.
fn pattern_term(t: &Term) -> Result<String> {
    match t {
        Term::BlankNode(b) => Ok(format!("?b_{}", b.label().replace(['-', '.'], "_"))),
        other => format_term(other),
    }
}

fn in_graph(graph: &GraphName, body: &str) -> Result<String> {
    match graph {
        GraphName::Default => Ok(body.to_string()),
        GraphName::Named(g) => Ok(format!("GRAPH {} {{ {body} }}", iri(g)?)),
    }
}

struct Vars(usize);

impl Vars {
    fn next(&mut self) -> String {
        self.0 += 1;
        format!("?v{}", self.0)
    }
}

/// One way to walk a path: its triple patterns and where it ends.
#[derive(Clone)]
struct Chain {
    patterns: Vec<String>,
    end: String,
    complete: bool,
}

fn expand_path(path: &PropertyPath, start: &str, vars: &mut Vars) -> Result<Vec<Chain>> {
    Ok(match path {
        PropertyPath::Predicate(p) => {
            let end = vars.next();
            vec![Chain { patterns: vec![format!("{start} {} {end} .", iri(p)?)], end, complete: true }]
        }
        PropertyPath::Inverse(inner) => match inner.as_ref() {
            PropertyPath::Predicate(p) => {
                let end = vars.next();
                vec![Chain { patterns: vec![format!("{end} {} {start} .", iri(p)?)], end, complete: true }]
            }
            other => expand_path(&other.inverted(), start, vars)?,
        },
        PropertyPath::Alternative(alts) => {
            let mut out = Vec::new();
            for alt in alts {
                out.extend(expand_path(alt, start, vars)?);
            }
            out
        }
        PropertyPath::Sequence(steps) => {
            let mut frontier = vec![Chain { patterns: Vec::new(), end: start.to_string(), complete: true }];
            let mut out = Vec::new();
            for (i, step) in steps.iter().enumerate() {
                let last = i + 1 == steps.len();
                let mut next = Vec::new();
                for chain in &frontier {
                    for e in expand_path(step, &chain.end, vars)? {
                        let mut patterns = chain.patterns.clone();
                        patterns.extend(e.patterns);
                        let combined = Chain { patterns, end: e.end, complete: e.complete && last };
                        if e.complete {
                            next.push(combined.clone());
                        }
                        if !last || !e.complete {
                            out.push(Chain { complete: false, ..combined });
                        }
                    }
                }
                frontier = next;
            }
            out.extend(frontier);
            out
        }
    })
}

/// Every UNION branch a shape needs, rooted at `node`.
fn shape_branches(shape: &Shape, node: &str, prefix: &[String], vars: &mut Vars, out: &mut Vec<Vec<String>>) -> Result<()> {
    let with_prefix = |patterns: &[String]| -> Vec<String> {
        prefix.iter().chain(patterns.iter()).cloned().collect()
    };

    for predicate in [rdf::TYPE, mu::UUID] {
        let v = vars.next();
        out.push(with_prefix(&[format!("{node} <{predicate}> {v} .")]));
    }
    for field in &shape.fields {
        for chain in expand_path(field, node, vars)? {
            out.push(with_prefix(&chain.patterns));
        }
    }
    for listing in &shape.listings {
        for chain in expand_path(&listing.scope, node, vars)? {
            let patterns = with_prefix(&chain.patterns);
            if chain.complete {
                shape_branches(&listing.each, &chain.end, &patterns, vars, out)?;
            }
            out.push(patterns);
        }
    }
    Ok(())
}

/// Template and UNION clause for a shape, not yet graph-wrapped.
fn render_shape(root: &Term, shape: &Shape) -> Result<(String, String)> {
    let mut branches = Vec::new();
    shape_branches(shape, &term(root)?, &[], &mut Vars(0), &mut branches)?;

    let mut template: Vec<&String> = branches.iter().flatten().collect();
    template.sort();
    template.dedup();
    let template: Vec<&str> = template.into_iter().map(String::as_str).collect();

    let union = branches
        .iter()
        .map(|b| format!("{{ {} }}", b.join(" ")))
        .collect::<Vec<_>>()
        .join(" UNION ");

    Ok((template.join(" "), union))
}

/// Render a read as a SPARQL CONSTRUCT.
pub fn render_construct(query: &Query) -> Result<String> {
    match query {
        Query::Pattern { graph, pattern } => {
            let body = render_pattern(pattern)?;
            Ok(format!("CONSTRUCT {{ {body} }} WHERE {{ {} }}", in_graph(graph, &body)?))
        }
        Query::Describe { graph, subjects, predicates } => {
            let mut body = String::new();
            match subjects {
                SubjectSelector::Exactly(subjects) => {
                    let values = subjects.iter().map(term).collect::<Result<Vec<_>>>()?;
                    let _ = write!(body, "VALUES ?s {{ {} }} ", values.join(" "));
                }
                SubjectSelector::Matching { predicate, objects } => {
                    let values = objects.iter().map(term).collect::<Result<Vec<_>>>()?;
                    let _ = write!(body, "VALUES ?sel {{ {} }} ?s {} ?sel . ", values.join(" "), iri(predicate)?);
                }
            }
            if !predicates.is_empty() {
                let values = predicates.iter().map(iri).collect::<Result<Vec<_>>>()?;
                let _ = write!(body, "VALUES ?p {{ {} }} ", values.join(" "));
            }
            body.push_str("?s ?p ?o .");
            Ok(format!("CONSTRUCT {{ ?s ?p ?o }} WHERE {{ {} }}", in_graph(graph, &body)?))
        }
        Query::Shape { graph, root, shape } => {
            let (template, union) = render_shape(root, shape)?;
            Ok(format!("CONSTRUCT {{ {template} }} WHERE {{ {} }}", in_graph(graph, &union)?))
        }
    }
}

fn render_pattern(pattern: &TriplePattern) -> Result<String> {
    let s = pattern.subject.as_ref().map(term).transpose()?.unwrap_or_else(|| "?s".into());
    let p = pattern.predicate.as_ref().map(iri).transpose()?.unwrap_or_else(|| "?p".into());
    let o = pattern.object.as_ref().map(term).transpose()?.unwrap_or_else(|| "?o".into());
    Ok(format!("{s} {p} {o} ."))
}

/// Render an existence check as SPARQL ASK.
pub fn render_ask(graph: &GraphName, pattern: &TriplePattern) -> Result<String> {
    Ok(format!("ASK {{ {} }}", in_graph(graph, &render_pattern(pattern)?)?))
}

fn render_shape_delete(sd: &ShapeDelete) -> Result<String> {
    let (template, union) = render_shape(&sd.root, &sd.shape)?;
    Ok(format!(
        "DELETE {{ {} }} WHERE {{ {} }}",
        in_graph(&sd.graph, &template)?,
        in_graph(&sd.graph, &union)?
    ))
}

fn ground_triple(t: &Triple) -> Result<String> {
    Ok(format!("{} {} {} .", term(&t.subject)?, iri(&t.predicate)?, term(&t.object)?))
}

fn group_by_graph<'a>(quads: impl Iterator<Item = &'a Quad>) -> BTreeMap<&'a GraphName, Vec<&'a Triple>> {
    let mut grouped: BTreeMap<&GraphName, Vec<&Triple>> = BTreeMap::new();
    for quad in quads {
        grouped.entry(&quad.graph).or_default().push(&quad.triple);
    }
    grouped
}

/// Render an update as one SPARQL Update request. Operations run in
/// order: shape delete, ground deletes, blank-node deletes, inserts.
/// Returns an empty string for an empty update.
pub fn render_update(update: &Update) -> Result<String> {
    let mut ops = Vec::new();

    if let Some(sd) = &update.delete_shape {
        ops.push(render_shape_delete(sd)?);
    }

    let (with_blank, ground): (Vec<&Quad>, Vec<&Quad>) = update
        .delete
        .iter()
        .partition(|q| q.triple.subject.is_blank_node() || q.triple.object.is_blank_node());

    for (graph, triples) in group_by_graph(ground.into_iter()) {
        let body = triples.into_iter().map(ground_triple).collect::<Result<Vec<_>>>()?.join(" ");
        ops.push(format!("DELETE DATA {{ {} }}", in_graph(graph, &body)?));
    }

    for quad in with_blank {
        let t = &quad.triple;
        let pattern = format!("{} {} {} .", pattern_term(&t.subject)?, iri(&t.predicate)?, pattern_term(&t.object)?);
        let scoped = in_graph(&quad.graph, &pattern)?;
        ops.push(format!("DELETE {{ {scoped} }} WHERE {{ {scoped} }}"));
    }

    for (graph, triples) in group_by_graph(update.insert.iter()) {
        let lines = triples
            .into_iter()
            .map(format_triple)
            .collect::<Result<Vec<_>>>()?;
        ops.push(format!("INSERT DATA {{ {} }}", in_graph(graph, &lines.join(" "))?));
    }

    Ok(ops.join(" ;\n"))
}

// ============================================================================
// SparqlStore
// ============================================================================

#[cfg(feature = "sparql")]
pub use client::SparqlStore;

#[cfg(feature = "sparql")]
mod client {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::{header, Client};
    use serde::Deserialize;

    use super::*;
    use crate::store::{TripleStore, UpdateStats};

    /// A remote SPARQL 1.1 endpoint.
    pub struct SparqlStore {
        client: Client,
        config: SparqlConfig,
    }

    #[derive(Debug, Deserialize)]
    struct AskResponse {
        boolean: bool,
    }

    impl SparqlStore {
        pub fn new(config: SparqlConfig) -> Result<Self> {
            let client = Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .map_err(http_error)?;
            Ok(Self { client, config })
        }

        fn update_endpoint(&self) -> &str {
            self.config.update_endpoint.as_deref().unwrap_or(&self.config.query_endpoint)
        }

        async fn query(&self, sparql: &str, accept: &str) -> Result<reqwest::Response> {
            tracing::trace!(query = sparql, "sparql query");
            let response = self
                .client
                .post(&self.config.query_endpoint)
                .header(header::ACCEPT, accept)
                .form(&[("query", sparql)])
                .send()
                .await
                .map_err(http_error)?;
            check_status(response).await
        }
    }

    fn http_error(e: reqwest::Error) -> Error {
        Error::StoreError(format!("sparql endpoint: {e}"))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(Error::StoreError(format!("sparql endpoint returned {status}: {message}")))
        }
    }

    #[async_trait]
    impl TripleStore for SparqlStore {
        fn name(&self) -> &str {
            "sparql"
        }

        async fn construct(&self, query: &Query) -> Result<Vec<Triple>> {
            let sparql = render_construct(query)?;
            let body = self
                .query(&sparql, "application/n-triples")
                .await?
                .text()
                .await
                .map_err(http_error)?;
            Ok(crate::turtle::parse_ntriples(&body)?.into_iter().collect())
        }

        async fn ask(&self, graph: &GraphName, pattern: &TriplePattern) -> Result<bool> {
            let sparql = render_ask(graph, pattern)?;
            let answer: AskResponse = self
                .query(&sparql, "application/sparql-results+json")
                .await?
                .json()
                .await
                .map_err(http_error)?;
            Ok(answer.boolean)
        }

        async fn update(&self, update: &Update) -> Result<UpdateStats> {
            let sparql = render_update(update)?;
            if sparql.is_empty() {
                return Ok(UpdateStats::default());
            }
            tracing::debug!(endpoint = self.update_endpoint(), "sparql update");
            let response = self
                .client
                .post(self.update_endpoint())
                .header(header::CONTENT_TYPE, "application/sparql-update")
                .body(sparql)
                .send()
                .await
                .map_err(http_error)?;
            check_status(response).await?;
            // The protocol does not report counts.
            Ok(UpdateStats {
                triples_inserted: update.insert.len(),
                triples_deleted: update.delete.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turtle;

    fn shape() -> Shape {
        let template = turtle::parse(
            "@prefix ex: <http://ex.org/> .
             @prefix form: <http://lblod.data.gift/vocabularies/forms/> .
             @prefix sh: <http://www.w3.org/ns/shacl#> .
             ex:form a form:Form ; form:includes ex:f, ex:g .
             ex:f sh:path ex:name .
             ex:g sh:path ( ex:address ex:street ) .",
        )
        .unwrap();
        Shape::from_form(&template, &Term::iri("http://ex.org/form")).unwrap()
    }

    #[test]
    fn test_shape_construct_has_union_per_path() {
        let q = Query::Shape { graph: GraphName::Default, root: Term::iri("http://ex.org/i"), shape: shape() };
        let sparql = render_construct(&q).unwrap();
        assert!(sparql.starts_with("CONSTRUCT {"));
        // type, uuid, name, address (partial) and address/street
        assert_eq!(sparql.matches(" UNION ").count(), 4);
        assert!(sparql.contains("<http://ex.org/i> <http://ex.org/name> ?v"));
    }

    #[test]
    fn test_named_graph_wraps_where_only() {
        let graph = GraphName::Named(Iri::new("http://ex.org/g"));
        let q = Query::Pattern { graph, pattern: TriplePattern::any().predicate("http://ex.org/p") };
        let sparql = render_construct(&q).unwrap();
        assert_eq!(
            sparql,
            "CONSTRUCT { ?s <http://ex.org/p> ?o . } WHERE { GRAPH <http://ex.org/g> { ?s <http://ex.org/p> ?o . } }"
        );
    }

    #[test]
    fn test_update_order_and_blank_deletes() {
        let g = GraphName::Default;
        let update = Update::new()
            .delete_shape(g.clone(), Term::iri("http://ex.org/i"), shape())
            .delete(&g, [
                Triple::new(Term::iri("http://ex.org/i"), "http://ex.org/name", Term::literal("old")),
                Triple::new(Term::blank("x"), "http://ex.org/street", Term::literal("s")),
            ])
            .insert(&g, [Triple::new(Term::iri("http://ex.org/i"), "http://ex.org/name", Term::literal("new"))]);
        let sparql = render_update(&update).unwrap();
        let ops: Vec<&str> = sparql.split(" ;\n").collect();
        assert_eq!(ops.len(), 4);
        assert!(ops[0].starts_with("DELETE {"));
        assert!(ops[1].starts_with("DELETE DATA"));
        assert!(ops[2].contains("?b_x <http://ex.org/street> \"s\""));
        assert!(ops[3].starts_with("INSERT DATA"));
    }

    #[test]
    fn test_empty_update_renders_nothing() {
        assert_eq!(render_update(&Update::new()).unwrap(), "");
    }

    #[test]
    fn test_blank_subject_cannot_be_described() {
        let q = Query::describe(vec![Term::blank("b")]);
        assert!(matches!(render_construct(&q), Err(Error::StoreError(_))));
    }
}
