//! Conversions between the crate's terms and `oxrdf`'s.
//!
//! `oxrdf` validates IRIs, blank node labels and language tags on the way
//! out, so anything that cannot be written surfaces here as an
//! `EncodingError`.

use oxrdf::{
    BlankNode as OxBlankNode, Literal as OxLiteral, NamedNode, Subject as OxSubject, Term as OxTerm,
    Triple as OxTriple,
};

use crate::model::vocab::rdf;
use crate::model::{BlankNode, Iri, Literal, LiteralKind, Term, Triple};
use crate::{Error, Result};

// ============================================================================
// oxrdf -> model
// ============================================================================

pub(crate) fn from_ox_triple(triple: OxTriple) -> Result<Triple> {
    Ok(Triple::new(
        from_ox_subject(triple.subject)?,
        Iri::new(triple.predicate.into_string()),
        from_ox_term(triple.object)?,
    ))
}

#[allow(unreachable_patterns)]
fn from_ox_subject(subject: OxSubject) -> Result<Term> {
    match subject {
        OxSubject::NamedNode(n) => Ok(Term::Iri(Iri::new(n.into_string()))),
        OxSubject::BlankNode(b) => Ok(Term::BlankNode(BlankNode::new(b.as_str()))),
        other => Err(Error::EncodingError(format!("quoted triple {other} is not supported"))),
    }
}

#[allow(unreachable_patterns)]
fn from_ox_term(term: OxTerm) -> Result<Term> {
    match term {
        OxTerm::NamedNode(n) => Ok(Term::Iri(Iri::new(n.into_string()))),
        OxTerm::BlankNode(b) => Ok(Term::BlankNode(BlankNode::new(b.as_str()))),
        OxTerm::Literal(l) => Ok(Term::Literal(from_ox_literal(&l))),
        other => Err(Error::EncodingError(format!("quoted triple {other} is not supported"))),
    }
}

fn from_ox_literal(literal: &OxLiteral) -> Literal {
    match literal.language() {
        Some(tag) => Literal::lang(literal.value(), tag),
        None => Literal::typed(literal.value(), literal.datatype().as_str()),
    }
}

// ============================================================================
// model -> oxrdf
// ============================================================================

pub(crate) fn to_ox_triple(triple: &Triple) -> Result<OxTriple> {
    Ok(OxTriple::new(
        to_ox_subject(&triple.subject)?,
        to_ox_named_node(&triple.predicate)?,
        to_ox_term(&triple.object)?,
    ))
}

fn to_ox_subject(term: &Term) -> Result<OxSubject> {
    match term {
        Term::Iri(iri) => Ok(to_ox_named_node(iri)?.into()),
        Term::BlankNode(b) => Ok(to_ox_blank_node(b)?.into()),
        Term::Literal(l) => Err(Error::EncodingError(format!("literal {l} cannot be a subject"))),
    }
}

pub(crate) fn to_ox_term(term: &Term) -> Result<OxTerm> {
    Ok(match term {
        Term::Iri(iri) => to_ox_named_node(iri)?.into(),
        Term::BlankNode(b) => to_ox_blank_node(b)?.into(),
        Term::Literal(l) => to_ox_literal(l)?.into(),
    })
}

fn to_ox_named_node(iri: &Iri) -> Result<NamedNode> {
    NamedNode::new(iri.as_str()).map_err(|e| Error::EncodingError(format!("IRI '{}': {e}", iri.as_str())))
}

fn to_ox_blank_node(b: &BlankNode) -> Result<OxBlankNode> {
    OxBlankNode::new(b.label()).map_err(|e| Error::EncodingError(format!("blank node label '{}': {e}", b.label())))
}

fn to_ox_literal(literal: &Literal) -> Result<OxLiteral> {
    match literal.kind() {
        LiteralKind::Simple => Ok(OxLiteral::new_simple_literal(literal.value())),
        LiteralKind::Lang(tag) => OxLiteral::new_language_tagged_literal(literal.value(), tag.as_str())
            .map_err(|e| Error::EncodingError(format!("language tag '{tag}': {e}"))),
        LiteralKind::Typed(dt) if dt.as_str() == rdf::LANG_STRING => Err(Error::EncodingError(format!(
            "literal {literal} has datatype rdf:langString but no language tag"
        ))),
        LiteralKind::Typed(dt) => Ok(OxLiteral::new_typed_literal(literal.value(), to_ox_named_node(dt)?)),
    }
}
