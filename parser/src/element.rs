use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use crate::location::{Location, LocationRange};

/// The `.debug_info` offset of an entry.
///
/// This is unique for all entries in a file and is used directly as the
/// key for references between elements. Offset 0 can never hold an entry
/// (it is inside the first unit header) so it doubles as "none" or `void`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    #[inline]
    pub fn new(offset: usize) -> ElementId {
        ElementId(offset)
    }

    #[inline]
    pub fn none() -> ElementId {
        ElementId(0)
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub fn get(self) -> Option<usize> {
        if self.is_none() {
            None
        } else {
            Some(self.0)
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// The kind of a materialized entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKind {
    Array,
    Class,
    Struct,
    Union,
    Enum,
    Pointer,
    Reference,
    RvalueReference,
    PointerToMember,
    Const,
    Volatile,
    Restrict,
    Atomic,
    Typedef,
    BaseType,
    Unspecified,
    SubroutineType,
    Subprogram,
    Variable,
    Member,
    LexicalBlock,
    Namespace,
    /// Synthetic marker closing the most recent open namespace.
    NamespaceEnd,
}

impl ElementKind {
    pub(crate) fn from_tag(tag: gimli::DwTag) -> Option<ElementKind> {
        let kind = match tag {
            gimli::DW_TAG_array_type => ElementKind::Array,
            gimli::DW_TAG_class_type => ElementKind::Class,
            gimli::DW_TAG_structure_type => ElementKind::Struct,
            gimli::DW_TAG_union_type => ElementKind::Union,
            gimli::DW_TAG_enumeration_type => ElementKind::Enum,
            gimli::DW_TAG_pointer_type => ElementKind::Pointer,
            gimli::DW_TAG_reference_type => ElementKind::Reference,
            gimli::DW_TAG_rvalue_reference_type => ElementKind::RvalueReference,
            gimli::DW_TAG_ptr_to_member_type => ElementKind::PointerToMember,
            gimli::DW_TAG_const_type => ElementKind::Const,
            gimli::DW_TAG_volatile_type => ElementKind::Volatile,
            gimli::DW_TAG_restrict_type => ElementKind::Restrict,
            gimli::DW_TAG_atomic_type => ElementKind::Atomic,
            gimli::DW_TAG_typedef => ElementKind::Typedef,
            gimli::DW_TAG_base_type => ElementKind::BaseType,
            gimli::DW_TAG_unspecified_type => ElementKind::Unspecified,
            gimli::DW_TAG_subroutine_type => ElementKind::SubroutineType,
            gimli::DW_TAG_subprogram => ElementKind::Subprogram,
            gimli::DW_TAG_variable => ElementKind::Variable,
            gimli::DW_TAG_member => ElementKind::Member,
            gimli::DW_TAG_lexical_block => ElementKind::LexicalBlock,
            gimli::DW_TAG_namespace => ElementKind::Namespace,
            _ => return None,
        };
        Some(kind)
    }

    /// Return true for struct, class and union.
    #[inline]
    pub fn is_aggregate(self) -> bool {
        match self {
            ElementKind::Class | ElementKind::Struct | ElementKind::Union => true,
            _ => false,
        }
    }

    /// Return true for elements that can carry a `Compound`.
    #[inline]
    pub fn is_composite(self) -> bool {
        match self {
            ElementKind::Class
            | ElementKind::Struct
            | ElementKind::Union
            | ElementKind::Enum
            | ElementKind::Array
            | ElementKind::SubroutineType
            | ElementKind::Subprogram
            | ElementKind::Namespace => true,
            _ => false,
        }
    }

    /// Return true for kinds that name a type.
    pub fn is_type(self) -> bool {
        match self {
            ElementKind::Subprogram
            | ElementKind::Variable
            | ElementKind::Member
            | ElementKind::LexicalBlock
            | ElementKind::Namespace
            | ElementKind::NamespaceEnd => false,
            _ => true,
        }
    }
}

/// An entry name.
///
/// Names read from `.debug_str` remember their offset in that pool, so two
/// names from the pool can be compared by identity. Inline names, and names
/// from other string sections, are compared by content.
#[derive(Debug, Clone)]
pub struct Name<'input> {
    pub(crate) text: Cow<'input, str>,
    pub(crate) pooled: Option<usize>,
}

impl<'input> Name<'input> {
    pub fn inline(text: Cow<'input, str>) -> Self {
        Name { text, pooled: None }
    }

    pub fn pooled(text: Cow<'input, str>, offset: usize) -> Self {
        Name {
            text,
            pooled: Some(offset),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The offset within `.debug_str`, if the name came from that pool.
    #[inline]
    pub fn pool_offset(&self) -> Option<usize> {
        self.pooled
    }
}

impl<'input> Deref for Name<'input> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl<'input> PartialEq for Name<'input> {
    fn eq(&self, other: &Self) -> bool {
        match (self.pooled, other.pooled) {
            (Some(a), Some(b)) if a == b => true,
            _ => self.text == other.text,
        }
    }
}

impl<'input> Eq for Name<'input> {}

impl<'input> fmt::Display for Name<'input> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Member accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl Access {
    pub(crate) fn from_dwarf(access: gimli::DwAccess) -> Option<Access> {
        match access {
            gimli::DW_ACCESS_public => Some(Access::Public),
            gimli::DW_ACCESS_protected => Some(Access::Protected),
            gimli::DW_ACCESS_private => Some(Access::Private),
            _ => None,
        }
    }
}

/// A source declaration position.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Source {
    pub(crate) file: Option<String>,
    pub(crate) line: u32,
}

impl Source {
    /// The resolved `dir/name` path of the declaring file.
    #[inline]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The source line number.
    ///
    /// 0 means unknown line number.
    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }
}

/// One decoded debug information entry.
#[derive(Debug, Clone)]
pub struct Element<'input> {
    pub(crate) id: ElementId,
    pub(crate) kind: ElementKind,
    pub(crate) level: usize,
    pub(crate) name: Option<Name<'input>>,
    pub(crate) linkage_name: Option<Name<'input>>,
    pub(crate) byte_size: Option<u64>,
    pub(crate) bit_offset: Option<u64>,
    pub(crate) data_bit_offset: Option<u64>,
    pub(crate) bit_size: Option<u64>,
    pub(crate) alignment: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) type_id: ElementId,
    pub(crate) address: Option<u64>,
    pub(crate) count: Option<u64>,
    pub(crate) specification: ElementId,
    pub(crate) abstract_origin: ElementId,
    pub(crate) declaration: bool,
    pub(crate) external: bool,
    pub(crate) artificial: bool,
    pub(crate) accessibility: Option<Access>,
    pub(crate) encoding: Option<gimli::DwAte>,
    pub(crate) const_value: Option<i64>,
    pub(crate) source: Source,
    pub(crate) locations: Vec<Location>,
    pub(crate) location_list: Vec<LocationRange>,
    pub(crate) compound: Option<Box<Compound<'input>>>,
}

impl<'input> Element<'input> {
    pub(crate) fn new(id: ElementId, kind: ElementKind, level: usize) -> Self {
        Element {
            id,
            kind,
            level,
            name: None,
            linkage_name: None,
            byte_size: None,
            bit_offset: None,
            data_bit_offset: None,
            bit_size: None,
            alignment: None,
            offset: None,
            type_id: ElementId::none(),
            address: None,
            count: None,
            specification: ElementId::none(),
            abstract_origin: ElementId::none(),
            declaration: false,
            external: false,
            artificial: false,
            accessibility: None,
            encoding: None,
            const_value: None,
            source: Source::default(),
            locations: Vec::new(),
            location_list: Vec::new(),
            compound: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ElementId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// The nesting depth. Namespaces do not count towards it, so a type
    /// defined at file scope or directly inside namespaces has level 1.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(Name::as_str)
    }

    #[inline]
    pub fn name_ref(&self) -> Option<&Name<'input>> {
        self.name.as_ref()
    }

    #[inline]
    pub fn linkage_name(&self) -> Option<&str> {
        self.linkage_name.as_ref().map(Name::as_str)
    }

    #[inline]
    pub fn byte_size(&self) -> Option<u64> {
        self.byte_size
    }

    #[inline]
    pub fn bit_offset(&self) -> Option<u64> {
        self.bit_offset
    }

    /// The bit offset of a bitfield from the start of the containing type.
    #[inline]
    pub fn data_bit_offset(&self) -> Option<u64> {
        self.data_bit_offset
    }

    #[inline]
    pub fn bit_size(&self) -> Option<u64> {
        self.bit_size
    }

    #[inline]
    pub fn alignment(&self) -> Option<u64> {
        self.alignment
    }

    /// The byte offset of a member within its containing type.
    #[inline]
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// The referenced type. `ElementId::none()` means `void`.
    #[inline]
    pub fn type_id(&self) -> ElementId {
        self.type_id
    }

    #[inline]
    pub fn address(&self) -> Option<u64> {
        self.address
    }

    /// The length of an array's first dimension.
    #[inline]
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    #[inline]
    pub fn specification(&self) -> ElementId {
        self.specification
    }

    #[inline]
    pub fn abstract_origin(&self) -> ElementId {
        self.abstract_origin
    }

    #[inline]
    pub fn is_declaration(&self) -> bool {
        self.declaration
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.external
    }

    #[inline]
    pub fn is_artificial(&self) -> bool {
        self.artificial
    }

    #[inline]
    pub fn accessibility(&self) -> Option<Access> {
        self.accessibility
    }

    #[inline]
    pub fn encoding(&self) -> Option<gimli::DwAte> {
        self.encoding
    }

    #[inline]
    pub fn const_value(&self) -> Option<i64> {
        self.const_value
    }

    #[inline]
    pub fn source(&self) -> &Source {
        &self.source
    }

    #[inline]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[inline]
    pub fn location_list(&self) -> &[LocationRange] {
        &self.location_list
    }

    /// The attached children, if any were ever attached.
    #[inline]
    pub fn compound(&self) -> Option<&Compound<'input>> {
        self.compound.as_deref()
    }

    pub(crate) fn compound_mut(&mut self) -> &mut Compound<'input> {
        self.compound.get_or_insert_with(Default::default)
    }
}

/// Children attached to a composite element.
#[derive(Debug, Default, Clone)]
pub struct Compound<'input> {
    pub(crate) members: Vec<Element<'input>>,
    pub(crate) parents: Vec<Inherit>,
    pub(crate) enumerators: Vec<Enumerator<'input>>,
    pub(crate) parameters: Vec<Parameter<'input>>,
    pub(crate) methods: Vec<Element<'input>>,
    pub(crate) dimensions: Vec<Subrange>,
}

impl<'input> Compound<'input> {
    /// Data members, in declaration order.
    #[inline]
    pub fn members(&self) -> &[Element<'input>] {
        &self.members
    }

    /// Base classes.
    #[inline]
    pub fn parents(&self) -> &[Inherit] {
        &self.parents
    }

    #[inline]
    pub fn enumerators(&self) -> &[Enumerator<'input>] {
        &self.enumerators
    }

    /// Formal parameters, including a trailing ellipsis if present.
    #[inline]
    pub fn parameters(&self) -> &[Parameter<'input>] {
        &self.parameters
    }

    /// Member functions.
    #[inline]
    pub fn methods(&self) -> &[Element<'input>] {
        &self.methods
    }

    /// Array dimensions.
    #[inline]
    pub fn dimensions(&self) -> &[Subrange] {
        &self.dimensions
    }
}

/// A base class record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Inherit {
    pub(crate) type_id: ElementId,
    pub(crate) offset: Option<u64>,
    pub(crate) access: Option<Access>,
}

impl Inherit {
    #[inline]
    pub fn type_id(&self) -> ElementId {
        self.type_id
    }

    #[inline]
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    #[inline]
    pub fn access(&self) -> Option<Access> {
        self.access
    }
}

/// An enumerator record.
#[derive(Debug, Default, Clone)]
pub struct Enumerator<'input> {
    pub(crate) name: Option<Name<'input>>,
    pub(crate) value: Option<i64>,
}

impl<'input> Enumerator<'input> {
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(Name::as_str)
    }

    #[inline]
    pub fn value(&self) -> Option<i64> {
        self.value
    }
}

/// A formal parameter record.
#[derive(Debug, Default, Clone)]
pub struct Parameter<'input> {
    pub(crate) id: ElementId,
    pub(crate) name: Option<Name<'input>>,
    pub(crate) type_id: ElementId,
    pub(crate) is_ellipsis: bool,
    pub(crate) artificial: bool,
    pub(crate) locations: Vec<Location>,
}

impl<'input> Parameter<'input> {
    #[inline]
    pub fn id(&self) -> ElementId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(Name::as_str)
    }

    #[inline]
    pub fn type_id(&self) -> ElementId {
        self.type_id
    }

    /// Return true for `...`.
    #[inline]
    pub fn is_ellipsis(&self) -> bool {
        self.is_ellipsis
    }

    /// Return true for compiler-generated parameters such as `this`.
    #[inline]
    pub fn is_artificial(&self) -> bool {
        self.artificial
    }

    #[inline]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }
}

/// One array dimension.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Subrange {
    pub(crate) lower: Option<u64>,
    pub(crate) upper: Option<u64>,
    pub(crate) count: Option<u64>,
}

impl Subrange {
    /// The number of elements in this dimension, if known.
    pub fn len(&self) -> Option<u64> {
        if let Some(count) = self.count {
            return Some(count);
        }
        let upper = self.upper?;
        let lower = self.lower.unwrap_or(0);
        Some(upper.wrapping_sub(lower).wrapping_add(1))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_identity() {
        let a = Name::pooled(Cow::Borrowed("Point"), 0x10);
        let b = Name::pooled(Cow::Borrowed("Point"), 0x40);
        let c = Name::inline(Cow::Borrowed("Point"));
        let d = Name::pooled(Cow::Borrowed("Other"), 0x10);
        assert_eq!(a, b);
        assert_eq!(a, c);
        // Same pool offset means same string.
        assert_eq!(a, d);
        assert_ne!(c, Name::inline(Cow::Borrowed("Pointer")));
    }

    #[test]
    fn subrange_len() {
        let count = Subrange {
            count: Some(3),
            ..Default::default()
        };
        assert_eq!(count.len(), Some(3));
        let upper = Subrange {
            upper: Some(9),
            ..Default::default()
        };
        assert_eq!(upper.len(), Some(10));
        let bounded = Subrange {
            lower: Some(1),
            upper: Some(4),
            count: None,
        };
        assert_eq!(bounded.len(), Some(4));
        assert_eq!(Subrange::default().len(), None);
    }
}
