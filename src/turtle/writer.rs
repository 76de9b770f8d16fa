//! Turtle / N-Triples output.
//!
//! Turtle output always starts with an `@prefix xsd:` header; the graph's
//! own prefixes are handed to the `oxttl` serializer, which abbreviates
//! with them. Triples are written in sorted order.

use oxttl::{NTriplesSerializer, TurtleSerializer};

use crate::model::vocab::xsd;
use crate::model::{Graph, Term, Triple};
use crate::{Error, Result};
use super::convert::{to_ox_term, to_ox_triple};

/// Serialize a graph to Turtle.
pub fn serialize(graph: &Graph) -> Result<String> {
    serialize_triples(graph.iter(), graph.prefixes().iter().map(|(p, ns)| (p.as_str(), ns.as_str())))
}

/// Serialize triples to Turtle with the given prefix bindings. Triples are
/// written in the order given.
pub fn serialize_triples<'a>(
    triples: impl IntoIterator<Item = &'a Triple>,
    prefixes: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<String> {
    let header = format!("@prefix xsd: <{}> .\n", xsd::NS).into_bytes();
    let mut serializer = TurtleSerializer::new();
    for (prefix, namespace) in prefixes.into_iter().filter(|(p, _)| *p != "xsd") {
        serializer = serializer
            .with_prefix(prefix, namespace)
            .map_err(|e| Error::EncodingError(format!("prefix {prefix}: <{namespace}>: {e}")))?;
    }
    let mut writer = serializer.for_writer(header);
    for triple in triples {
        writer.serialize_triple(&to_ox_triple(triple)?)?;
    }
    into_text(writer.finish()?)
}

/// Serialize triples as N-Triples (no headers, no abbreviations).
pub fn to_ntriples<'a>(triples: impl IntoIterator<Item = &'a Triple>) -> Result<String> {
    let mut writer = NTriplesSerializer::new().for_writer(Vec::new());
    for triple in triples {
        writer.serialize_triple(&to_ox_triple(triple)?)?;
    }
    into_text(writer.finish())
}

/// One triple in N-Triples syntax, terminating ` .` included.
pub fn format_triple(triple: &Triple) -> Result<String> {
    Ok(format!("{} .", to_ox_triple(triple)?))
}

/// One term in N-Triples syntax.
pub fn format_term(term: &Term) -> Result<String> {
    Ok(to_ox_term(term)?.to_string())
}

fn into_text(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::EncodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::vocab::rdf;
    use crate::model::Literal;
    use crate::turtle::parse;

    #[test]
    fn test_header_comes_first() {
        let mut g = Graph::from_triples([
            Triple::new(Term::iri("http://ex.org/b"), "http://ex.org/p", Term::literal("2")),
            Triple::new(Term::iri("http://ex.org/a"), "http://ex.org/p", Term::literal("1")),
        ]);
        g.set_prefix("ex", "http://ex.org/");
        let out = serialize(&g).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .");
        assert!(out.contains("@prefix ex: <http://ex.org/> ."));
        assert!(out.contains("ex:a"));
        assert!(out.find("ex:a").unwrap() < out.find("ex:b").unwrap());
        assert_eq!(parse(&out).unwrap(), g);
    }

    #[test]
    fn test_empty_graph_still_has_header() {
        let out = serialize(&Graph::new()).unwrap();
        assert!(out.starts_with("@prefix xsd:"));
        assert!(parse(&out).unwrap().is_empty());
    }

    #[test]
    fn test_ntriples_spell_out_datatypes() {
        let g = Graph::from_triples([Triple::new(
            Term::iri("http://ex.org/a"),
            "http://ex.org/n",
            Literal::typed("5", xsd::INTEGER),
        )]);
        assert_eq!(parse(&serialize(&g).unwrap()).unwrap(), g);
        let nt = to_ntriples(g.iter()).unwrap();
        assert_eq!(nt.trim_end(), "<http://ex.org/a> <http://ex.org/n> \"5\"^^<http://www.w3.org/2001/XMLSchema#integer> .");
    }

    #[test]
    fn test_format_triple() {
        let t = Triple::new(Term::iri("http://ex.org/a"), "http://ex.org/p", Literal::lang("hi", "en"));
        assert_eq!(format_triple(&t).unwrap(), "<http://ex.org/a> <http://ex.org/p> \"hi\"@en .");
        assert_eq!(format_term(&Term::blank("b0")).unwrap(), "_:b0");
    }

    #[test]
    fn test_invalid_iri_is_encoding_error() {
        let g = Graph::from_triples([Triple::new(
            Term::iri("http://ex.org/has space"),
            "http://ex.org/p",
            Term::literal("x"),
        )]);
        assert!(matches!(serialize(&g), Err(Error::EncodingError(_))));
    }

    #[test]
    fn test_lang_string_without_tag_is_encoding_error() {
        let g = Graph::from_triples([Triple::new(
            Term::iri("http://ex.org/a"),
            "http://ex.org/p",
            Literal::typed("x", rdf::LANG_STRING),
        )]);
        assert!(matches!(serialize(&g), Err(Error::EncodingError(_))));
    }

    #[test]
    fn test_escaping_survives_parse() {
        let g = Graph::from_triples([Triple::new(
            Term::iri("http://ex.org/a"),
            "http://ex.org/p",
            Term::literal("line\nwith \"quotes\" and \\ slash\ttab"),
        )]);
        assert_eq!(parse(&serialize(&g).unwrap()).unwrap(), g);
    }
}
