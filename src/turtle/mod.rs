//! Turtle text format.
//!
//! Templates, form instances, meta data and history snapshots all travel
//! as Turtle; SPARQL endpoints answer CONSTRUCT queries in N-Triples.
//! Both are read and written with `oxttl`. Labelled blank nodes keep their
//! label, anonymous ones (`[ ]`) get a fresh label on every parse.

mod convert;
pub mod writer;

pub use writer::{format_term, format_triple, serialize, serialize_triples, to_ntriples};

use oxttl::{NTriplesParser, TurtleParser, TurtleSyntaxError};

use crate::model::Graph;
use crate::{Error, Result};

/// Parse a Turtle document. Its prefix declarations are kept on the graph.
pub fn parse(document: &str) -> Result<Graph> {
    let mut graph = Graph::new();
    let mut parser = TurtleParser::new().for_slice(document.as_bytes());
    for triple in parser.by_ref() {
        graph.insert(convert::from_ox_triple(triple.map_err(syntax_error)?)?);
    }
    for (prefix, namespace) in parser.prefixes() {
        graph.set_prefix(prefix, namespace);
    }
    Ok(graph)
}

/// Parse an N-Triples document.
pub fn parse_ntriples(document: &str) -> Result<Graph> {
    let mut graph = Graph::new();
    for triple in NTriplesParser::new().for_slice(document.as_bytes()) {
        graph.insert(convert::from_ox_triple(triple.map_err(syntax_error)?)?);
    }
    Ok(graph)
}

/// Positions are reported 1-based.
fn syntax_error(e: TurtleSyntaxError) -> Error {
    let start = e.location().start;
    Error::ParseError {
        line: start.line as usize + 1,
        column: start.column as usize + 1,
        message: e.message().to_string(),
    }
}
