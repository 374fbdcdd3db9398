use std::borrow::Cow;
use std::ops::Deref;

use fnv::FnvHashMap;

use crate::element::{Element, ElementId, ElementKind};

/// Compilation unit metadata read from the unit header and root entry.
#[derive(Debug, Default, Clone)]
pub struct UnitInfo<'input> {
    pub(crate) name: Option<Cow<'input, str>>,
    pub(crate) comp_dir: Option<Cow<'input, str>>,
    pub(crate) producer: Option<Cow<'input, str>>,
    pub(crate) language: Option<gimli::DwLang>,
    pub(crate) package_name: Option<Cow<'input, str>>,
    pub(crate) version: u16,
    pub(crate) address_size: u8,
    pub(crate) offset: usize,
    pub(crate) low_pc: Option<u64>,
}

impl<'input> UnitInfo<'input> {
    /// The path of the primary source file.
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(Cow::deref)
    }

    /// The working directory when the unit was compiled.
    pub fn comp_dir(&self) -> Option<&str> {
        self.comp_dir.as_ref().map(Cow::deref)
    }

    pub fn producer(&self) -> Option<&str> {
        self.producer.as_ref().map(Cow::deref)
    }

    #[inline]
    pub fn language(&self) -> Option<gimli::DwLang> {
        self.language
    }

    /// The Go package name, from `DW_AT_go_package_name`.
    pub fn package_name(&self) -> Option<&str> {
        self.package_name.as_ref().map(Cow::deref)
    }

    /// The DWARF version from the unit header.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    #[inline]
    pub fn address_size(&self) -> u8 {
        self.address_size
    }

    /// The offset of the unit header within `.debug_info`.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The base address.
    #[inline]
    pub fn low_pc(&self) -> Option<u64> {
        self.low_pc
    }
}

/// Go extension attributes of one element.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GoAttributes {
    pub(crate) kind: Option<u64>,
    pub(crate) key: ElementId,
    pub(crate) elem: ElementId,
    pub(crate) embedded_field: bool,
    pub(crate) runtime_type: Option<u64>,
    pub(crate) dict_index: Option<u64>,
}

impl GoAttributes {
    /// The Go `reflect.Kind` value.
    #[inline]
    pub fn kind(&self) -> Option<u64> {
        self.kind
    }

    /// The key type of a map.
    #[inline]
    pub fn key(&self) -> ElementId {
        self.key
    }

    /// The element type of a map, slice, channel or array.
    #[inline]
    pub fn elem(&self) -> ElementId {
        self.elem
    }

    #[inline]
    pub fn is_embedded_field(&self) -> bool {
        self.embedded_field
    }

    /// The address of the runtime type descriptor.
    #[inline]
    pub fn runtime_type(&self) -> Option<u64> {
        self.runtime_type
    }

    #[inline]
    pub fn dict_index(&self) -> Option<u64> {
        self.dict_index
    }
}

/// The finished element tree of one compilation unit.
///
/// Elements are stored in entry order. Nesting is recorded by each
/// element's level, and namespace boundaries by `NamespaceEnd` markers.
#[derive(Debug, Default)]
pub struct UnitTree<'input> {
    pub(crate) info: UnitInfo<'input>,
    pub(crate) elements: Vec<Element<'input>>,
    pub(crate) index: FnvHashMap<ElementId, usize>,
    pub(crate) lang_ext: FnvHashMap<ElementId, GoAttributes>,
    pub(crate) replaced: FnvHashMap<ElementId, ElementId>,
    pub(crate) balanced: bool,
}

impl<'input> UnitTree<'input> {
    #[inline]
    pub fn info(&self) -> &UnitInfo<'input> {
        &self.info
    }

    #[inline]
    pub fn elements(&self) -> &[Element<'input>] {
        &self.elements
    }

    /// Find an element of this unit by id.
    pub fn get(&self, id: ElementId) -> Option<&Element<'input>> {
        self.index.get(&id).map(|&index| &self.elements[index])
    }

    /// The first definition that replaces the element with the given id.
    pub fn replacement(&self, id: ElementId) -> Option<ElementId> {
        self.replaced.get(&id).cloned()
    }

    #[inline]
    pub fn is_replaced(&self, id: ElementId) -> bool {
        self.replaced.contains_key(&id)
    }

    /// Go extension attributes recorded for an element or member.
    pub fn go_attributes(&self, id: ElementId) -> Option<&GoAttributes> {
        self.lang_ext.get(&id)
    }

    /// Return false if the unit's entry stream did not close every scope it
    /// opened.
    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.balanced
    }

    /// Iterate over the elements of a given kind.
    pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = &Element<'input>> {
        self.elements.iter().filter(move |e| e.kind == kind)
    }
}
