//! Substitution-group expansion

use std::collections::{BTreeSet, HashSet};

use crate::schema::{DerivationSet, ElemHandle, ParsedSchema, TypeKey};
use crate::semantic::derivation::derivation_methods;

use super::glushkov::{Glushkov, Symbol};

/// Derivation methods a head refuses in its substitutes: its own `block`
/// plus the `block` of its type
fn blocked_methods(schema: &ParsedSchema, head: ElemHandle) -> DerivationSet {
    let decl = schema.element(head);
    let type_block = match decl.resolved_type {
        Some(TypeKey::Def(id)) => schema
            .type_def(id)
            .as_complex()
            .map_or(DerivationSet::empty(), |c| c.block_set),
        _ => DerivationSet::empty(),
    };
    decl.block.union(type_block)
}

/// Whether `member`'s type is derived from `head`'s type without a method
/// the head blocks
fn admitted(schema: &ParsedSchema, head: ElemHandle, member: ElemHandle) -> bool {
    let blocked = blocked_methods(schema, head);
    let member_type = schema.element(member).resolved_type;
    match (member_type, schema.element(head).resolved_type) {
        (Some(m), Some(h)) => {
            derivation_methods(schema, m, h).map_or(true, |methods| !blocked.intersects(methods))
        }
        _ => true,
    }
}

/// Direct members of a head's substitution group that its `block` admits
pub fn direct_members(schema: &ParsedSchema, head: ElemHandle) -> Vec<ElemHandle> {
    let decl = schema.element(head);
    if !decl.global || decl.block.contains(DerivationSet::SUBSTITUTION) {
        return Vec::new();
    }
    let names = match schema.substitution_groups.get(&decl.name) {
        Some(names) => names,
        None => return Vec::new(),
    };
    names
        .iter()
        .filter_map(|name| schema.global_element(name))
        .filter(|member| admitted(schema, head, *member))
        .collect()
}

/// Every element that may appear in place of `head`
///
/// Members reached through an intermediate head are checked against the
/// derivation from `head`'s own type, so a method `head` blocks stays
/// blocked however deep the member sits.
pub fn substitution_members(schema: &ParsedSchema, head: ElemHandle) -> Vec<ElemHandle> {
    expand_substitution_members(head, &|h| direct_members(schema, h))
        .into_iter()
        .filter(|member| admitted(schema, head, *member))
        .collect()
}

/// Transitive members of a head's substitution group, in breadth-first order
///
/// The head itself is not included.
pub fn expand_substitution_members(
    head: ElemHandle,
    members_of: &dyn Fn(ElemHandle) -> Vec<ElemHandle>,
) -> Vec<ElemHandle> {
    let mut out = Vec::new();
    let mut seen = HashSet::from([head]);
    let mut queue = std::collections::VecDeque::from([head]);
    while let Some(current) = queue.pop_front() {
        for member in members_of(current) {
            if seen.insert(member) {
                out.push(member);
                queue.push_back(member);
            }
        }
    }
    out
}

/// Give every element position the positions of its substitution members
///
/// `members_of` yields the full member list of a head, as
/// [`substitution_members`] does. Each member gets a new position that
/// shares the head's follow set and appears wherever the head does.
pub fn expand_substitution(
    g: &Glushkov,
    members_of: &dyn Fn(ElemHandle) -> Vec<ElemHandle>,
) -> Glushkov {
    let mut out = g.clone();
    // position → added copies
    let mut copies: Vec<Vec<usize>> = vec![Vec::new(); g.positions.len()];
    for (p, symbol) in g.positions.iter().enumerate() {
        if let Symbol::Element(head) = symbol {
            for member in members_of(*head) {
                out.positions.push(Symbol::Element(member));
                out.follow.push(g.follow[p].clone());
                copies[p].push(out.positions.len() - 1);
            }
        }
    }
    if copies.iter().all(Vec::is_empty) {
        return out;
    }
    let widen = |set: &BTreeSet<usize>| -> BTreeSet<usize> {
        let mut wide = set.clone();
        for p in set {
            wide.extend(copies[*p].iter().copied());
        }
        wide
    };
    out.first = widen(&g.first);
    out.last = widen(&g.last);
    for follow in out.follow.iter_mut() {
        *follow = widen(follow);
    }
    for counter in out.counters.iter_mut() {
        counter.positions = widen(&counter.positions);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Limits;
    use crate::models::glushkov::{build_glushkov, Expr};
    use crate::namespaces::QName;
    use crate::registry::tests::resolved;

    #[test]
    fn test_transitive_members() {
        // 0 <- 1 <- 2, and 2 <- 0 closes a loop that must not repeat
        let members = |h: ElemHandle| match h.0 {
            0 => vec![ElemHandle(1)],
            1 => vec![ElemHandle(2)],
            2 => vec![ElemHandle(0)],
            _ => Vec::new(),
        };
        assert_eq!(
            expand_substitution_members(ElemHandle(0), &members),
            vec![ElemHandle(1), ElemHandle(2)]
        );
    }

    #[test]
    fn test_expansion_copies_positions() {
        // head then x
        let expr = Expr::Seq(vec![
            Expr::Leaf(Symbol::Element(ElemHandle(0))),
            Expr::Leaf(Symbol::Element(ElemHandle(9))),
        ]);
        let g = build_glushkov(&expr, &Limits::default()).unwrap();
        let members = |h: ElemHandle| {
            if h.0 == 0 {
                vec![ElemHandle(5)]
            } else {
                Vec::new()
            }
        };
        let e = expand_substitution(&g, &members);
        assert_eq!(e.positions.len(), 3);
        assert_eq!(e.positions[2], Symbol::Element(ElemHandle(5)));
        assert_eq!(e.first, BTreeSet::from([0, 2]));
        assert_eq!(e.follow[2], BTreeSet::from([1]));
    }

    #[test]
    fn test_head_block_reaches_transitive_members() {
        // m2 extends the head's type through m1, whose own block is empty
        let schema = resolved(
            r#"
            <xs:complexType name="B"><xs:sequence/></xs:complexType>
            <xs:complexType name="D">
              <xs:complexContent><xs:extension base="tns:B"/></xs:complexContent>
            </xs:complexType>
            <xs:element name="h" type="tns:B" block="extension"/>
            <xs:element name="m1" type="tns:B" substitutionGroup="tns:h"/>
            <xs:element name="m2" type="tns:D" substitutionGroup="tns:m1"/>
            "#,
        );
        let elem = |n: &str| schema.global_element(&QName::new("urn:t", n)).unwrap();
        let (h, m1, m2) = (elem("h"), elem("m1"), elem("m2"));
        assert_eq!(substitution_members(&schema, h), vec![m1]);
        assert_eq!(substitution_members(&schema, m1), vec![m2]);
    }

    #[test]
    fn test_type_block_reaches_members() {
        let schema = resolved(
            r#"
            <xs:complexType name="B" block="extension"><xs:sequence/></xs:complexType>
            <xs:complexType name="D">
              <xs:complexContent><xs:extension base="tns:B"/></xs:complexContent>
            </xs:complexType>
            <xs:element name="h" type="tns:B"/>
            <xs:element name="m" type="tns:D" substitutionGroup="tns:h"/>
            "#,
        );
        let h = schema.global_element(&QName::new("urn:t", "h")).unwrap();
        assert!(substitution_members(&schema, h).is_empty());
    }
}
