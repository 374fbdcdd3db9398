//! Assemble the depth-first entry stream of a unit into an element tree.
//!
//! The walker drives this through `open`, `set`, `push`/`leaf` and `close`,
//! and hands the result over with `finish_unit`. Nothing here knows about
//! the DWARF encoding of the values.

use fnv::FnvHashMap;

use crate::dedup::DedupTable;
use crate::element::{
    Access, Compound, Element, ElementId, ElementKind, Enumerator, Inherit, Name, Parameter,
    Subrange,
};
use crate::location::{Location, LocationRange};
use crate::options::Options;
use crate::unit::{GoAttributes, UnitInfo, UnitTree};

/// A decoded attribute value with meaning to the tree.
#[derive(Debug, Clone)]
pub(crate) enum Attr<'input> {
    Name(Name<'input>),
    LinkageName(Name<'input>),
    ByteSize(u64),
    BitOffset(u64),
    DataBitOffset(u64),
    BitSize(u64),
    Alignment(u64),
    Type(ElementId),
    Address(u64),
    Count(u64),
    UpperBound(i64),
    LowerBound(u64),
    Specification(ElementId),
    AbstractOrigin(ElementId),
    MemberOffset(u64),
    ConstValue(i64),
    Accessibility(Access),
    Declaration(bool),
    External(bool),
    Artificial(bool),
    Encoding(gimli::DwAte),
    DeclFile(String),
    DeclLine(u32),
    Location(Vec<Location>),
    LocationList(Vec<LocationRange>),
    Go(GoAttr),
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum GoAttr {
    Kind(u64),
    Key(ElementId),
    Elem(ElementId),
    EmbeddedField(bool),
    RuntimeType(u64),
    DictIndex(u64),
}

/// What `open` did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// The entry became an element or a record.
    Materialized,
    /// The entry was not materialized, but its children may be.
    Transparent,
    /// The entry and all of its children are ignored.
    Skipped,
}

/// Where a compound lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Holder {
    Element(usize),
    Method(usize, usize),
}

/// One open nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Unit,
    Holder(Holder),
    /// A member or other record; its children are ignored.
    Record,
    /// A lexical block that is not materialized.
    Transparent,
    Skipped,
}

/// The most recently opened entry. Attribute setters apply to this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Current {
    None,
    Holder(Holder),
    Member(usize, usize),
    Parameter(Holder, usize),
    Enumerator(usize, usize),
    Parent(usize, usize),
    Dimension(usize, usize),
}

/// The kind of parent an entry is being attached to.
#[derive(Debug, Clone, Copy)]
enum Context {
    /// The unit root or a namespace.
    Top,
    Aggregate(usize),
    Enum(usize),
    Array(usize),
    SubroutineType(usize),
    Function(Holder),
    /// Inside a function body, directly or via a lexical block.
    Body,
    Rejecting,
}

pub(crate) struct TreeBuilder<'input, 'a> {
    options: &'a Options,
    dedup: DedupTable<'input>,
    info: UnitInfo<'input>,
    elements: Vec<Element<'input>>,
    lang_ext: FnvHashMap<ElementId, GoAttributes>,
    stack: Vec<Scope>,
    namespaces: usize,
    transparent: usize,
    current: Current,
    pending: Scope,
    unbalanced: bool,
}

impl<'input, 'a> TreeBuilder<'input, 'a> {
    pub(crate) fn new(options: &'a Options) -> Self {
        TreeBuilder {
            options,
            dedup: DedupTable::new(),
            info: UnitInfo::default(),
            elements: Vec::new(),
            lang_ext: FnvHashMap::default(),
            stack: Vec::new(),
            namespaces: 0,
            transparent: 0,
            current: Current::None,
            pending: Scope::Skipped,
            unbalanced: false,
        }
    }

    #[inline]
    pub(crate) fn dedup(&self) -> &DedupTable<'input> {
        &self.dedup
    }

    /// Begin a new unit. Any state left over from the previous unit is
    /// discarded.
    pub(crate) fn start_unit(&mut self, info: UnitInfo<'input>) {
        if !self.stack.is_empty() {
            warn!("discarding {} open scopes from previous unit", self.stack.len());
        }
        self.info = info;
        self.elements = Vec::new();
        self.lang_ext = FnvHashMap::default();
        self.stack.clear();
        self.namespaces = 0;
        self.transparent = 0;
        self.current = Current::None;
        self.pending = Scope::Skipped;
        self.unbalanced = false;
    }

    #[inline]
    pub(crate) fn info_mut(&mut self) -> &mut UnitInfo<'input> {
        &mut self.info
    }

    /// Open the scope of the unit root entry.
    pub(crate) fn push_root(&mut self) {
        self.pending = Scope::Unit;
        self.push();
    }

    /// The current nesting depth, not counting namespaces or transparent
    /// blocks.
    #[inline]
    pub(crate) fn level(&self) -> usize {
        self.stack.len() - self.namespaces - self.transparent
    }

    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    fn context(&self) -> Context {
        match self.stack.last() {
            None => Context::Rejecting,
            Some(Scope::Unit) => Context::Top,
            Some(Scope::Holder(holder @ Holder::Method(..))) => Context::Function(*holder),
            Some(Scope::Holder(Holder::Element(index))) => {
                let index = *index;
                match self.elements[index].kind {
                    ElementKind::Namespace => Context::Top,
                    ElementKind::Struct | ElementKind::Class | ElementKind::Union => {
                        Context::Aggregate(index)
                    }
                    ElementKind::Enum => Context::Enum(index),
                    ElementKind::Array => Context::Array(index),
                    ElementKind::SubroutineType => Context::SubroutineType(index),
                    ElementKind::Subprogram => Context::Function(Holder::Element(index)),
                    ElementKind::LexicalBlock => Context::Body,
                    _ => Context::Rejecting,
                }
            }
            Some(Scope::Transparent) => Context::Body,
            Some(Scope::Record) | Some(Scope::Skipped) => Context::Rejecting,
        }
    }

    /// Decide whether an entry is materialized, and make it current.
    pub(crate) fn open(&mut self, id: ElementId, tag: gimli::DwTag) -> Disposition {
        self.current = Current::None;
        self.pending = Scope::Skipped;
        let context = self.context();
        if let Context::Rejecting = context {
            return Disposition::Skipped;
        }
        let bodies = self.options.function_bodies;
        match tag {
            gimli::DW_TAG_member => match context {
                Context::Aggregate(owner) => self.add_member(owner, id, ElementKind::Member),
                _ => Disposition::Skipped,
            },
            gimli::DW_TAG_variable => match context {
                Context::Top => self.add_element(id, ElementKind::Variable),
                Context::Aggregate(owner) => self.add_member(owner, id, ElementKind::Variable),
                Context::Function(_) | Context::Body if bodies && self.options.local_variables => {
                    self.add_element(id, ElementKind::Variable)
                }
                _ => Disposition::Skipped,
            },
            gimli::DW_TAG_subprogram if self.options.functions => match context {
                Context::Top => self.add_element(id, ElementKind::Subprogram),
                Context::Aggregate(owner) => self.add_method(owner, id),
                _ => Disposition::Skipped,
            },
            gimli::DW_TAG_formal_parameter => self.add_parameter(context, id, false),
            gimli::DW_TAG_unspecified_parameters => self.add_parameter(context, id, true),
            gimli::DW_TAG_enumerator => match context {
                Context::Enum(owner) => {
                    let compound = self.elements[owner].compound_mut();
                    compound.enumerators.push(Enumerator::default());
                    self.current = Current::Enumerator(owner, compound.enumerators.len() - 1);
                    self.pending = Scope::Record;
                    Disposition::Materialized
                }
                _ => Disposition::Skipped,
            },
            gimli::DW_TAG_inheritance => match context {
                Context::Aggregate(owner) => {
                    let compound = self.elements[owner].compound_mut();
                    compound.parents.push(Inherit::default());
                    self.current = Current::Parent(owner, compound.parents.len() - 1);
                    self.pending = Scope::Record;
                    Disposition::Materialized
                }
                _ => Disposition::Skipped,
            },
            gimli::DW_TAG_subrange_type => match context {
                Context::Array(owner) => {
                    let compound = self.elements[owner].compound_mut();
                    compound.dimensions.push(Subrange::default());
                    self.current = Current::Dimension(owner, compound.dimensions.len() - 1);
                    self.pending = Scope::Record;
                    Disposition::Materialized
                }
                _ => Disposition::Skipped,
            },
            gimli::DW_TAG_lexical_block => match context {
                Context::Function(Holder::Element(_)) | Context::Body if bodies => {
                    if self.options.lexical_blocks {
                        self.add_element(id, ElementKind::LexicalBlock)
                    } else {
                        self.pending = Scope::Transparent;
                        Disposition::Transparent
                    }
                }
                _ => Disposition::Skipped,
            },
            gimli::DW_TAG_namespace => match context {
                Context::Top => self.add_element(id, ElementKind::Namespace),
                _ => Disposition::Skipped,
            },
            _ => match ElementKind::from_tag(tag) {
                Some(kind) if kind.is_type() => match context {
                    Context::Top | Context::Aggregate(_) => self.add_element(id, kind),
                    Context::Function(Holder::Element(_)) | Context::Body if bodies => {
                        self.add_element(id, kind)
                    }
                    _ => Disposition::Skipped,
                },
                _ => {
                    trace!("skipping {} at {}", tag, id);
                    Disposition::Skipped
                }
            },
        }
    }

    fn add_element(&mut self, id: ElementId, kind: ElementKind) -> Disposition {
        let index = self.elements.len();
        self.elements.push(Element::new(id, kind, self.level()));
        self.current = Current::Holder(Holder::Element(index));
        self.pending = Scope::Holder(Holder::Element(index));
        Disposition::Materialized
    }

    fn add_member(&mut self, owner: usize, id: ElementId, kind: ElementKind) -> Disposition {
        let level = self.level();
        let compound = self.elements[owner].compound_mut();
        compound.members.push(Element::new(id, kind, level));
        self.current = Current::Member(owner, compound.members.len() - 1);
        self.pending = Scope::Record;
        Disposition::Materialized
    }

    fn add_method(&mut self, owner: usize, id: ElementId) -> Disposition {
        let level = self.level();
        let compound = self.elements[owner].compound_mut();
        compound
            .methods
            .push(Element::new(id, ElementKind::Subprogram, level));
        let holder = Holder::Method(owner, compound.methods.len() - 1);
        self.current = Current::Holder(holder);
        self.pending = Scope::Holder(holder);
        Disposition::Materialized
    }

    fn add_parameter(&mut self, context: Context, id: ElementId, is_ellipsis: bool) -> Disposition {
        let holder = match context {
            Context::Function(holder) => holder,
            Context::SubroutineType(index) => Holder::Element(index),
            _ => return Disposition::Skipped,
        };
        // A parameter belongs only to the scope directly enclosing it.
        let owner_level = self.holder_element(holder).level;
        if owner_level + 1 != self.level() {
            debug!("rejecting parameter at {}: level {}", id, self.level());
            return Disposition::Skipped;
        }
        let parameters = &mut self.compound_mut(holder).parameters;
        parameters.push(Parameter {
            id,
            is_ellipsis,
            ..Default::default()
        });
        let index = parameters.len() - 1;
        self.current = Current::Parameter(holder, index);
        self.pending = Scope::Record;
        Disposition::Materialized
    }

    fn holder_element(&self, holder: Holder) -> &Element<'input> {
        match holder {
            Holder::Element(index) => &self.elements[index],
            Holder::Method(owner, index) => match self.elements[owner].compound {
                Some(ref compound) => &compound.methods[index],
                None => &self.elements[owner],
            },
        }
    }

    fn holder_element_mut(&mut self, holder: Holder) -> &mut Element<'input> {
        match holder {
            Holder::Element(index) => &mut self.elements[index],
            Holder::Method(owner, index) => &mut self.elements[owner].compound_mut().methods[index],
        }
    }

    fn compound_mut(&mut self, holder: Holder) -> &mut Compound<'input> {
        self.holder_element_mut(holder).compound_mut()
    }

    /// Apply an attribute to the current entry.
    pub(crate) fn set(&mut self, attr: Attr<'input>) {
        match self.current {
            Current::None => {}
            Current::Holder(holder) => {
                let element = self.holder_element_mut(holder);
                let id = element.id;
                if let Some(go) = set_element(element, attr) {
                    set_go(self.lang_ext.entry(id).or_insert_with(Default::default), go);
                }
            }
            Current::Member(owner, index) => {
                let member = &mut self.elements[owner].compound_mut().members[index];
                let id = member.id;
                if let Some(go) = set_element(member, attr) {
                    set_go(self.lang_ext.entry(id).or_insert_with(Default::default), go);
                }
            }
            Current::Parameter(holder, index) => {
                let parameter = &mut self.compound_mut(holder).parameters[index];
                set_parameter(parameter, attr);
            }
            Current::Enumerator(owner, index) => {
                let enumerator = &mut self.elements[owner].compound_mut().enumerators[index];
                match attr {
                    Attr::Name(name) => enumerator.name = Some(name),
                    Attr::ConstValue(value) => enumerator.value = Some(value),
                    _ => {}
                }
            }
            Current::Parent(owner, index) => {
                let parent = &mut self.elements[owner].compound_mut().parents[index];
                match attr {
                    Attr::Type(id) => parent.type_id = id,
                    Attr::MemberOffset(offset) => parent.offset = Some(offset),
                    Attr::Accessibility(access) => parent.access = Some(access),
                    _ => {}
                }
            }
            Current::Dimension(owner, index) => {
                let element = &mut self.elements[owner];
                let len = {
                    let dimension = &mut element.compound_mut().dimensions[index];
                    match attr {
                        Attr::Count(count) => dimension.count = Some(count),
                        // A negative upper bound marks a flexible array.
                        Attr::UpperBound(upper) if upper < 0 => dimension.count = Some(0),
                        Attr::UpperBound(upper) => dimension.upper = Some(upper as u64),
                        Attr::LowerBound(lower) => dimension.lower = Some(lower),
                        _ => return,
                    }
                    dimension.len()
                };
                if index == 0 {
                    element.count = len;
                }
            }
        }
    }

    /// Open the scope of the current entry, which has children.
    pub(crate) fn push(&mut self) {
        let scope = self.pending;
        match scope {
            Scope::Holder(Holder::Element(index))
                if self.elements[index].kind == ElementKind::Namespace =>
            {
                self.namespaces += 1;
            }
            Scope::Transparent => self.transparent += 1,
            _ => {}
        }
        self.stack.push(scope);
        self.pending = Scope::Skipped;
    }

    /// Finish the current entry, which has no children or whose children
    /// were skipped.
    pub(crate) fn leaf(&mut self) {
        if let Scope::Holder(Holder::Element(index)) = self.pending {
            if self.elements[index].kind == ElementKind::Namespace {
                self.end_namespace(index);
            }
        }
        self.pending = Scope::Skipped;
    }

    /// Close the innermost scope.
    pub(crate) fn close(&mut self) {
        self.current = Current::None;
        match self.stack.pop() {
            Some(Scope::Holder(Holder::Element(index)))
                if self.elements[index].kind == ElementKind::Namespace =>
            {
                self.namespaces -= 1;
                self.end_namespace(index);
            }
            Some(Scope::Transparent) => self.transparent -= 1,
            Some(_) => {}
            None => {
                debug!("ignoring end of children with no open scope");
                self.unbalanced = true;
            }
        }
    }

    fn end_namespace(&mut self, index: usize) {
        let namespace = &self.elements[index];
        let end = Element::new(namespace.id, ElementKind::NamespaceEnd, namespace.level);
        self.elements.push(end);
    }

    /// Complete the unit: balance the stack, deduplicate, and hand over the
    /// tree.
    pub(crate) fn finish_unit(&mut self) -> UnitTree<'input> {
        if !self.stack.is_empty() {
            warn!(
                "unit at 0x{:x}: {} scopes still open at end of unit",
                self.info.offset,
                self.stack.len()
            );
            self.unbalanced = true;
            while !self.stack.is_empty() {
                self.close();
            }
        }
        let elements = std::mem::replace(&mut self.elements, Vec::new());
        let mut index = FnvHashMap::default();
        for (i, element) in elements.iter().enumerate() {
            if element.kind != ElementKind::NamespaceEnd {
                index.insert(element.id, i);
            }
        }
        let mut tree = UnitTree {
            info: std::mem::replace(&mut self.info, UnitInfo::default()),
            elements,
            index,
            lang_ext: std::mem::replace(&mut self.lang_ext, FnvHashMap::default()),
            replaced: FnvHashMap::default(),
            balanced: !self.unbalanced,
        };
        if self.options.deduplicate {
            self.dedup.process(&mut tree);
        }
        self.current = Current::None;
        self.pending = Scope::Skipped;
        self.namespaces = 0;
        self.transparent = 0;
        self.unbalanced = false;
        tree
    }
}

fn set_element<'input>(element: &mut Element<'input>, attr: Attr<'input>) -> Option<GoAttr> {
    match attr {
        Attr::Name(name) => element.name = Some(name),
        Attr::LinkageName(name) => element.linkage_name = Some(name),
        Attr::ByteSize(size) => element.byte_size = Some(size),
        Attr::BitOffset(offset) => element.bit_offset = Some(offset),
        Attr::DataBitOffset(offset) => element.data_bit_offset = Some(offset),
        Attr::BitSize(size) => element.bit_size = Some(size),
        Attr::Alignment(alignment) => element.alignment = Some(alignment),
        Attr::Type(id) => element.type_id = id,
        Attr::Address(address) => element.address = Some(address),
        Attr::Count(count) => element.count = Some(count),
        Attr::Specification(id) => element.specification = id,
        Attr::AbstractOrigin(id) => element.abstract_origin = id,
        Attr::MemberOffset(offset) => element.offset = Some(offset),
        Attr::ConstValue(value) => element.const_value = Some(value),
        Attr::Accessibility(access) => element.accessibility = Some(access),
        Attr::Declaration(flag) => element.declaration = flag,
        Attr::External(flag) => element.external = flag,
        Attr::Artificial(flag) => element.artificial = flag,
        Attr::Encoding(encoding) => element.encoding = Some(encoding),
        Attr::DeclFile(file) => element.source.file = Some(file),
        Attr::DeclLine(line) => element.source.line = line,
        Attr::Location(locations) => element.locations = locations,
        Attr::LocationList(ranges) => element.location_list = ranges,
        Attr::Go(go) => return Some(go),
        Attr::UpperBound(_) | Attr::LowerBound(_) => {}
    }
    None
}

fn set_parameter<'input>(parameter: &mut Parameter<'input>, attr: Attr<'input>) {
    match attr {
        Attr::Name(name) => parameter.name = Some(name),
        Attr::Type(id) => parameter.type_id = id,
        Attr::Artificial(flag) => parameter.artificial = flag,
        Attr::Location(locations) => parameter.locations = locations,
        _ => {}
    }
}

fn set_go(attributes: &mut GoAttributes, go: GoAttr) {
    match go {
        GoAttr::Kind(kind) => attributes.kind = Some(kind),
        GoAttr::Key(id) => attributes.key = id,
        GoAttr::Elem(id) => attributes.elem = id,
        GoAttr::EmbeddedField(flag) => attributes.embedded_field = flag,
        GoAttr::RuntimeType(address) => attributes.runtime_type = Some(address),
        GoAttr::DictIndex(index) => attributes.dict_index = Some(index),
    }
}
