use fnv::FnvHashMap;

use parser::{DedupTable, Element, ElementId, ElementKind, UnitTree};

mod outline;
pub use self::outline::OutlinePrinter;

mod text;
pub use self::text::TextPrinter;

// Deeper chains than this are assumed to be cycles in malformed input.
const MAX_TYPE_DEPTH: usize = 32;

/// Printable names of types, kept across units.
///
/// References with `DW_FORM_ref_addr` can point into a unit that has
/// already been printed and dropped, so the names of its types are
/// recorded when it completes.
#[derive(Debug, Default)]
pub(crate) struct TypeNames {
    names: FnvHashMap<ElementId, String>,
}

impl TypeNames {
    /// Remember the names of the types in a finished unit.
    pub(crate) fn record(&mut self, tree: &UnitTree, dedup: &DedupTable) {
        for element in tree.elements() {
            if element.kind().is_type() {
                let name = self.type_name(tree, element.id());
                self.names.insert(element.id(), name);
            }
        }
        // Replaced ids are still referenced by entries in later units.
        for element in tree.elements() {
            if let Some(first) = dedup.replacement(element.id()) {
                if let Some(name) = self.names.get(&first).cloned() {
                    self.names.insert(element.id(), name);
                }
            }
        }
    }

    /// Return the C spelling of the type with the given id.
    pub(crate) fn type_name(&self, tree: &UnitTree, id: ElementId) -> String {
        self.type_name_depth(tree, id, 0)
    }

    fn type_name_depth(&self, tree: &UnitTree, id: ElementId, depth: usize) -> String {
        if id.is_none() {
            return "void".into();
        }
        if depth > MAX_TYPE_DEPTH {
            return "...".into();
        }
        let element = match tree.get(id) {
            Some(element) => element,
            None => {
                return match self.names.get(&id) {
                    Some(name) => name.clone(),
                    None => {
                        debug!("unresolved type reference {}", id);
                        "<invalid-type>".into()
                    }
                };
            }
        };
        let inner = |id| self.type_name_depth(tree, id, depth + 1);
        match element.kind() {
            ElementKind::Struct => format!("struct {}", anon(element)),
            ElementKind::Class => format!("class {}", anon(element)),
            ElementKind::Union => format!("union {}", anon(element)),
            ElementKind::Enum => format!("enum {}", anon(element)),
            ElementKind::Pointer => format!("{}*", spaced(inner(element.type_id()))),
            ElementKind::Reference => format!("{}&", spaced(inner(element.type_id()))),
            ElementKind::RvalueReference => format!("{}&&", spaced(inner(element.type_id()))),
            ElementKind::PointerToMember => format!("{}::*", spaced(inner(element.type_id()))),
            ElementKind::Const => format!("const {}", inner(element.type_id())),
            ElementKind::Volatile => format!("volatile {}", inner(element.type_id())),
            ElementKind::Restrict => format!("{} restrict", inner(element.type_id())),
            ElementKind::Atomic => format!("_Atomic {}", inner(element.type_id())),
            ElementKind::Array => {
                let mut name = inner(element.type_id());
                name.push_str(&dimensions(element));
                name
            }
            ElementKind::SubroutineType => {
                let params = element
                    .compound()
                    .map(|compound| self.parameter_list(tree, compound.parameters(), depth))
                    .unwrap_or_default();
                format!("{} ({})", inner(element.type_id()), params)
            }
            ElementKind::BaseType | ElementKind::Typedef | ElementKind::Unspecified => {
                anon(element).into()
            }
            _ => element.name().unwrap_or("<invalid-type>").into(),
        }
    }

    /// Format a parameter list without names, as used in function types.
    fn parameter_list(
        &self,
        tree: &UnitTree,
        parameters: &[parser::Parameter],
        depth: usize,
    ) -> String {
        let mut list = Vec::new();
        for parameter in parameters {
            if parameter.is_ellipsis() {
                list.push("...".to_string());
            } else {
                list.push(self.type_name_depth(tree, parameter.type_id(), depth + 1));
            }
        }
        list.join(", ")
    }
}

fn anon<'a>(element: &'a Element) -> &'a str {
    element.name().unwrap_or("<anon>")
}

/// Join a type and a declared name, as in `int x` or `char *p`.
pub(crate) fn declare(ty: &str, name: &str) -> String {
    if ty.ends_with('*') || ty.ends_with('&') {
        format!("{}{}", ty, name)
    } else {
        format!("{} {}", ty, name)
    }
}

fn spaced(mut name: String) -> String {
    if !name.ends_with('*') && !name.ends_with('&') {
        name.push(' ');
    }
    name
}

/// Format the array dimensions, `[]` for unknown bounds.
fn dimensions(element: &Element) -> String {
    let mut out = String::new();
    let dimensions = element
        .compound()
        .map(|compound| compound.dimensions())
        .unwrap_or(&[]);
    if dimensions.is_empty() {
        match element.count() {
            Some(count) => out.push_str(&format!("[{}]", count)),
            None => out.push_str("[]"),
        }
    }
    for dimension in dimensions {
        match dimension.len() {
            Some(len) => out.push_str(&format!("[{}]", len)),
            None => out.push_str("[]"),
        }
    }
    out
}
