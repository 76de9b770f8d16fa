//! Template merge: fold an extension into its base.

use std::collections::BTreeSet;

use crate::model::vocab::{ext, form, mu, rdf};
use crate::model::*;
use crate::Result;
use super::TemplateGraph;

/// Properties the extension always wins on; the base root loses its copies.
const EXTENSION_WINS: [&str; 4] = [form::TARGET_TYPE, form::TARGET_LABEL, ext::PREFIX, mu::UUID];

/// Merge `extension` into `base`, returning the derived template rooted at
/// the base root.
///
/// The derived graph holds every triple of both inputs except the base
/// root's instance metadata, with the extension root unified into the base
/// root and `ext:extendsGroup` groups folded into the groups they extend.
pub fn merge_extension(base: &TemplateGraph, extension: &TemplateGraph) -> Result<TemplateGraph> {
    let base_root = base.root_term();
    let ext_root = extension.root_term();

    let mut working = base.graph().clone();
    for predicate in EXTENSION_WINS {
        working.remove_matching(Some(&base_root), Some(&Iri::new(predicate)), None);
    }

    let incoming = rename_colliding_blanks(extension.graph(), &base.graph().blank_node_labels());
    working.merge_prefixes(&incoming);
    working.extend(incoming);

    working.rename(&ext_root, &base_root);
    working.remove_matching(Some(&base_root), Some(&Iri::new(ext::EXTENDS_FORM)), None);
    working.remove_matching(
        Some(&base_root),
        Some(&Iri::new(rdf::TYPE)),
        Some(&Term::iri(form::EXTENSION)),
    );

    fold_extended_groups(&mut working);

    tracing::debug!(
        base = %base.root(),
        extension = %extension.root(),
        triples = working.len(),
        "merged template extension"
    );
    Ok(TemplateGraph::from_parts(working, base.root().clone()))
}

/// Copy of `graph` whose blank node labels avoid `taken`.
fn rename_colliding_blanks(graph: &Graph, taken: &BTreeSet<String>) -> Graph {
    let own = graph.blank_node_labels();
    let mut out = graph.clone();
    let mut n = 0usize;
    for label in own.intersection(taken) {
        let fresh = loop {
            let candidate = format!("{label}_x{n}");
            n += 1;
            if !taken.contains(&candidate) && !own.contains(&candidate) {
                break candidate;
            }
        };
        out.rename(&Term::blank(label.clone()), &Term::blank(fresh));
    }
    out
}

/// Every `?g ext:extendsGroup ?base`: references to `?g` now point at
/// `?base`, and `?g` itself goes away.
fn fold_extended_groups(graph: &mut Graph) {
    let extends_group = Iri::new(ext::EXTENDS_GROUP);
    let pairs: Vec<(Term, Term)> = graph
        .triples_matching(None, Some(&extends_group), None)
        .map(|t| (t.subject.clone(), t.object.clone()))
        .collect();

    for (group, target) in pairs {
        graph.remove_matching(Some(&group), None, None);
        let references: Vec<Triple> = graph.triples_matching(None, None, Some(&group)).cloned().collect();
        for triple in references {
            graph.remove(&triple);
            graph.insert(Triple::new(triple.subject, triple.predicate, target.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::vocab::sh;
    use pretty_assertions::assert_eq;

    const BASE: &str = r#"
        @prefix form: <http://lblod.data.gift/vocabularies/forms/> .
        @prefix ext: <http://mu.semte.ch/vocabularies/ext/> .
        @prefix mu: <http://mu.semte.ch/vocabularies/core/> .
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://ex.org/> .

        ex:form a form:Form ;
            mu:uuid "base" ;
            form:targetType ex:Thing ;
            form:targetLabel ex:name ;
            ext:prefix "http://data.ex.org/thing/" ;
            form:includes ex:name .
        ex:name sh:path ex:name ; sh:group ex:mainGroup ; sh:order _:order .
        _:order ex:n 1 .
        ex:mainGroup a form:PropertyGroup .
    "#;

    const EXTENSION: &str = r#"
        @prefix form: <http://lblod.data.gift/vocabularies/forms/> .
        @prefix ext: <http://mu.semte.ch/vocabularies/ext/> .
        @prefix mu: <http://mu.semte.ch/vocabularies/core/> .
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://ex.org/> .

        ex:extForm a form:Extension ;
            ext:extendsForm ex:form ;
            mu:uuid "derived" ;
            form:targetType ex:SpecialThing ;
            form:includes ex:extra .
        ex:extra sh:path ex:extra ; sh:group ex:extGroup ; sh:order _:order .
        _:order ex:n 2 .
        ex:extGroup ext:extendsGroup ex:mainGroup ; a form:PropertyGroup .
    "#;

    fn merged() -> TemplateGraph {
        let base = TemplateGraph::parse(BASE).unwrap();
        let extension = TemplateGraph::parse(EXTENSION).unwrap();
        merge_extension(&base, &extension).unwrap()
    }

    #[test]
    fn test_extension_metadata_wins() {
        let t = merged();
        assert_eq!(t.root().as_str(), "http://ex.org/form");
        assert_eq!(t.id().as_deref(), Some("derived"));
        assert_eq!(t.target_type().unwrap().as_str(), "http://ex.org/SpecialThing");
        // Stripped from the base, not supplied by the extension.
        assert!(t.target_label().is_none());
        assert!(t.prefix().is_none());
        assert!(!t.is_extension());
    }

    #[test]
    fn test_fields_of_both_are_included() {
        let t = merged();
        let includes: Vec<&Term> = t.graph().objects(&t.root_term(), &Iri::new(form::INCLUDES)).collect();
        assert_eq!(includes, vec![&Term::iri("http://ex.org/extra"), &Term::iri("http://ex.org/name")]);
        assert!(t.graph().subjects(&Iri::new(ext::EXTENDS_FORM), None).is_empty());
        assert!(!t.graph().contains(&Triple::new(t.root_term(), rdf::TYPE, Term::iri(form::EXTENSION))));
    }

    #[test]
    fn test_extended_group_is_folded() {
        let t = merged();
        let group = t.graph().object(&Term::iri("http://ex.org/extra"), &Iri::new(sh::GROUP)).unwrap();
        assert_eq!(group, &Term::iri("http://ex.org/mainGroup"));
        assert_eq!(t.graph().triples_matching(Some(&Term::iri("http://ex.org/extGroup")), None, None).count(), 0);
    }

    #[test]
    fn test_colliding_blank_nodes_stay_distinct() {
        // Both documents label their sh:order node _:order.
        let t = merged();
        let n = Iri::new("http://ex.org/n");
        let orders: Vec<&Term> = t.graph().triples_matching(None, Some(&n), None).map(|t| &t.subject).collect();
        assert_eq!(orders.len(), 2);
        assert_ne!(orders[0], orders[1]);
    }
}
