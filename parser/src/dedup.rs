use std::borrow::Cow;

use fnv::FnvHashMap;

use crate::element::{Element, ElementId, ElementKind, Name};
use crate::unit::UnitTree;

/// Identity of the first definition for each top-level `(kind, name)`.
///
/// This is the only state that persists across compilation units.
#[derive(Debug, Default)]
pub struct DedupTable<'input> {
    by_pool: FnvHashMap<(ElementKind, usize), ElementId>,
    by_name: FnvHashMap<ElementKind, FnvHashMap<Cow<'input, str>, ElementId>>,
    count: usize,
    replaced: FnvHashMap<ElementId, ElementId>,
}

impl<'input> DedupTable<'input> {
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of distinct definitions recorded.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Find the first definition with this identity.
    pub fn lookup(&self, kind: ElementKind, name: &Name<'input>) -> Option<ElementId> {
        if let Some(offset) = name.pool_offset() {
            if let Some(id) = self.by_pool.get(&(kind, offset)) {
                return Some(*id);
            }
        }
        // Not every producer pools every string, so the same name may
        // appear both inline and pooled.
        self.by_name
            .get(&kind)
            .and_then(|names| names.get(name.as_str()))
            .cloned()
    }

    #[inline]
    pub fn is_defined(&self, kind: ElementKind, name: &Name<'input>) -> bool {
        self.lookup(kind, name).is_some()
    }

    /// The first definition that replaces the element with the given id, in
    /// any unit decoded so far.
    pub fn replacement(&self, id: ElementId) -> Option<ElementId> {
        self.replaced.get(&id).cloned()
    }

    /// The number of elements replaced so far.
    pub fn replaced_count(&self) -> usize {
        self.replaced.len()
    }

    fn insert(&mut self, kind: ElementKind, name: &Name<'input>, id: ElementId) {
        if let Some(offset) = name.pool_offset() {
            self.by_pool.entry((kind, offset)).or_insert(id);
        }
        let names = self.by_name.entry(kind).or_insert_with(FnvHashMap::default);
        if !names.contains_key(name.as_str()) {
            names.insert(name.text.clone(), id);
            self.count += 1;
        }
    }

    /// Record the unit's definitions, and mark those already defined.
    ///
    /// Entries are checked in order against the live table, so a repeated
    /// definition later in the same unit is also replaced.
    pub(crate) fn process(&mut self, tree: &mut UnitTree<'input>) {
        for element in &tree.elements {
            let name = match candidate(element) {
                Some(name) => name,
                None => continue,
            };
            match self.lookup(element.kind, name) {
                Some(first) if first != element.id => {
                    trace!(
                        "{:?} {} at {} replaced by {}",
                        element.kind,
                        name,
                        element.id,
                        first
                    );
                    tree.replaced.insert(element.id, first);
                    self.replaced.insert(element.id, first);
                }
                Some(_) => {}
                None => self.insert(element.kind, name, element.id),
            }
        }
    }
}

fn candidate<'a, 'input>(element: &'a Element<'input>) -> Option<&'a Name<'input>> {
    if element.level > 1 || element.declaration {
        return None;
    }
    match element.kind {
        ElementKind::Namespace | ElementKind::NamespaceEnd => None,
        _ => element.name.as_ref(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn named(offset: usize, kind: ElementKind, level: usize, name: Name<'static>) -> Element<'static> {
        let mut element = Element::new(ElementId::new(offset), kind, level);
        element.name = Some(name);
        element
    }

    fn tree(elements: Vec<Element<'static>>) -> UnitTree<'static> {
        UnitTree {
            elements,
            ..Default::default()
        }
    }

    #[test]
    fn pooled_and_inline_names() {
        let mut table = DedupTable::new();
        let mut first = tree(vec![named(
            0x20,
            ElementKind::Struct,
            1,
            Name::pooled(Cow::Borrowed("Point"), 0x100),
        )]);
        table.process(&mut first);
        assert!(first.replaced.is_empty());

        let mut second = tree(vec![
            named(0x80, ElementKind::Struct, 1, Name::inline(Cow::Borrowed("Point"))),
            named(0x90, ElementKind::Union, 1, Name::inline(Cow::Borrowed("Point"))),
            named(0xa0, ElementKind::Struct, 1, Name::pooled(Cow::Borrowed("Point"), 0x100)),
        ]);
        table.process(&mut second);
        assert_eq!(second.replacement(ElementId::new(0x80)), Some(ElementId::new(0x20)));
        assert_eq!(second.replacement(ElementId::new(0x90)), None);
        assert_eq!(second.replacement(ElementId::new(0xa0)), Some(ElementId::new(0x20)));
        assert_eq!(table.replaced_count(), 2);
    }

    #[test]
    fn nested_and_declarations_ignored() {
        let mut table = DedupTable::new();
        let mut decl = named(0x20, ElementKind::Struct, 1, Name::inline(Cow::Borrowed("S")));
        decl.declaration = true;
        let mut first = tree(vec![
            decl,
            named(0x30, ElementKind::Struct, 2, Name::inline(Cow::Borrowed("Inner"))),
            named(0x40, ElementKind::Namespace, 1, Name::inline(Cow::Borrowed("ns"))),
            named(0x50, ElementKind::Struct, 1, Name::inline(Cow::Borrowed("S"))),
        ]);
        table.process(&mut first);
        assert!(first.replaced.is_empty());
        assert_eq!(
            table.lookup(ElementKind::Struct, &Name::inline(Cow::Borrowed("S"))),
            Some(ElementId::new(0x50))
        );
        assert!(!table.is_defined(ElementKind::Struct, &Name::inline(Cow::Borrowed("Inner"))));
        assert!(!table.is_defined(ElementKind::Namespace, &Name::inline(Cow::Borrowed("ns"))));
    }

    #[test]
    fn repeated_in_same_unit() {
        let mut table = DedupTable::new();
        let mut unit = tree(vec![
            named(0x20, ElementKind::Typedef, 1, Name::inline(Cow::Borrowed("T"))),
            named(0x40, ElementKind::Typedef, 1, Name::inline(Cow::Borrowed("T"))),
        ]);
        table.process(&mut unit);
        assert_eq!(unit.replacement(ElementId::new(0x40)), Some(ElementId::new(0x20)));
        assert!(!unit.is_replaced(ElementId::new(0x20)));
    }
}
