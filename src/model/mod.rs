//! # RDF Graph Model
//!
//! Plain data types that cross every boundary: turtle ↔ store ↔ engines ↔ caller.
//!
//! Design rule: no store handles, no caches, no async here. Everything in
//! this module is a pure function of its inputs.

pub mod term;
pub mod triple;
pub mod graph;
pub mod path;
pub mod vocab;

pub use term::{Iri, BlankNode, Literal, LiteralKind, Term};
pub use triple::{Triple, Quad, GraphName};
pub use graph::Graph;
pub use path::{PropertyPath, Shape, ListingShape, identity_predicates};
