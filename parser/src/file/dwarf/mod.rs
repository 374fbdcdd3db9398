//! The compilation unit walker.

mod abbrev;
mod expr;
mod form;
mod line;

use std::borrow::Cow;

use gimli::{Endianity as _, Reader as _};

use self::abbrev::{Abbreviations, AttributeSpec};
use self::expr::Expression;
use self::form::AttrValue;
use self::line::LineTable;
use crate::builder::{Attr, Disposition, GoAttr, TreeBuilder};
use crate::element::{Access, ElementId, Name};
use crate::file::{DebugSections, ParseStats};
use crate::location;
use crate::options::Options;
use crate::unit::UnitInfo;
use crate::{Result, Sink};

pub(crate) type Reader<'input> = gimli::EndianSlice<'input, gimli::RunTimeEndian>;

// Go extensions.
const DW_AT_GO_KIND: gimli::DwAt = gimli::DwAt(0x2900);
const DW_AT_GO_KEY: gimli::DwAt = gimli::DwAt(0x2901);
const DW_AT_GO_ELEM: gimli::DwAt = gimli::DwAt(0x2902);
const DW_AT_GO_EMBEDDED_FIELD: gimli::DwAt = gimli::DwAt(0x2903);
const DW_AT_GO_RUNTIME_TYPE: gimli::DwAt = gimli::DwAt(0x2904);
const DW_AT_GO_PACKAGE_NAME: gimli::DwAt = gimli::DwAt(0x2905);
const DW_AT_GO_DICT_INDEX: gimli::DwAt = gimli::DwAt(0x2906);

const DW_AT_GNU_LOCVIEWS: gimli::DwAt = gimli::DwAt(0x2137);
const DW_AT_GNU_ENTRY_VIEW: gimli::DwAt = gimli::DwAt(0x2138);

/// A unit header from `.debug_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnitHeader {
    /// The offset of the header itself.
    pub offset: usize,
    pub format: gimli::Format,
    pub version: u16,
    pub unit_type: gimli::DwUt,
    pub address_size: u8,
    pub abbrev_offset: usize,
    /// The offset of the first entry.
    pub entries: usize,
    /// The offset one past the end of the unit.
    pub end: usize,
    pub dwo_id: Option<u64>,
    pub type_signature: Option<u64>,
    pub type_offset: Option<usize>,
}

impl UnitHeader {
    #[inline]
    fn is_supported(&self) -> bool {
        self.version >= 2 && self.version <= 5
    }
}

pub(crate) fn read_u24(r: &mut Reader) -> gimli::Result<u32> {
    let b0 = u32::from(r.read_u8()?);
    let b1 = u32::from(r.read_u8()?);
    let b2 = u32::from(r.read_u8()?);
    if r.endian().is_big_endian() {
        Ok(b0 << 16 | b1 << 8 | b2)
    } else {
        Ok(b2 << 16 | b1 << 8 | b0)
    }
}

/// A unit header that could not be read.
#[derive(Debug)]
struct HeaderError {
    error: gimli::Error,
    /// Where the next unit starts, if the initial length was readable.
    end: Option<usize>,
}

fn read_header(debug_info: Reader, offset: usize) -> std::result::Result<UnitHeader, HeaderError> {
    let mut r = debug_info.range_from(offset..);
    let (length, format) = r
        .read_initial_length()
        .map_err(|error| HeaderError { error, end: None })?;
    let start = r.offset_from(debug_info);
    let length = if length > r.len() {
        debug!(
            "unit at 0x{:x}: length 0x{:x} exceeds section, truncating",
            offset, length
        );
        r.len()
    } else {
        length
    };
    let end = start + length;
    read_header_fields(debug_info, r, offset, format, length)
        .map_err(|error| HeaderError {
            error,
            end: Some(end),
        })
}

fn read_header_fields(
    debug_info: Reader,
    mut r: Reader,
    offset: usize,
    format: gimli::Format,
    length: usize,
) -> gimli::Result<UnitHeader> {
    let start = r.offset_from(debug_info);
    let mut r = r.split(length)?;
    let version = r.read_u16()?;
    let mut header = UnitHeader {
        offset,
        format,
        version,
        unit_type: gimli::DW_UT_compile,
        address_size: 0,
        abbrev_offset: 0,
        entries: start + length,
        end: start + length,
        dwo_id: None,
        type_signature: None,
        type_offset: None,
    };
    match version {
        2..=4 => {
            header.abbrev_offset = r.read_offset(format)?;
            header.address_size = r.read_u8()?;
        }
        5 => {
            header.unit_type = gimli::DwUt(r.read_u8()?);
            header.address_size = r.read_u8()?;
            header.abbrev_offset = r.read_offset(format)?;
            match header.unit_type {
                gimli::DW_UT_skeleton | gimli::DW_UT_split_compile => {
                    header.dwo_id = Some(r.read_u64()?);
                }
                gimli::DW_UT_type | gimli::DW_UT_split_type => {
                    header.type_signature = Some(r.read_u64()?);
                    header.type_offset = Some(r.read_offset(format)?);
                }
                _ => {}
            }
        }
        _ => return Ok(header),
    }
    header.entries = r.offset_from(debug_info);
    Ok(header)
}

/// Byte views of the sections the walker reads.
struct Sections<'input> {
    debug_info: Reader<'input>,
    debug_abbrev: Reader<'input>,
    debug_str: Reader<'input>,
    debug_str_offsets: Reader<'input>,
    debug_addr: Reader<'input>,
    debug_loc: Reader<'input>,
    debug_line: Reader<'input>,
    debug_line_str: Reader<'input>,
}

impl<'input> Sections<'input> {
    fn new(sections: &'input DebugSections) -> Self {
        let endian = sections.endian;
        let reader = |data: &'input Cow<[u8]>| Reader::new(data, endian);
        Sections {
            debug_info: reader(&sections.debug_info),
            debug_abbrev: reader(&sections.debug_abbrev),
            debug_str: reader(&sections.debug_str),
            debug_str_offsets: reader(&sections.debug_str_offsets),
            debug_addr: reader(&sections.debug_addr),
            debug_loc: reader(&sections.debug_loc),
            debug_line: reader(&sections.debug_line),
            debug_line_str: reader(&sections.debug_line_str),
        }
    }
}

/// Decode every unit in `.debug_info`, handing each finished tree to the
/// sink.
pub(crate) fn parse<'input, S>(
    sections: &'input DebugSections,
    options: &Options,
    sink: &mut S,
) -> Result<ParseStats>
where
    S: Sink<'input>,
{
    let sections = Sections::new(sections);
    if sections.debug_info.is_empty() {
        return Err("missing .debug_info section".into());
    }
    let mut builder = TreeBuilder::new(options);
    let mut stats = ParseStats::default();
    let mut offset = 0;
    while offset < sections.debug_info.len() {
        let header = match read_header(sections.debug_info, offset) {
            Ok(header) => header,
            Err(e) => {
                warn!("unit at 0x{:x}: invalid header: {}", offset, e.error);
                stats.failed_units += 1;
                match e.end {
                    Some(end) => {
                        offset = end;
                        continue;
                    }
                    None => break,
                }
            }
        };
        if !header.is_supported() {
            debug!(
                "unit at 0x{:x}: unsupported DWARF version {}",
                offset, header.version
            );
            stats.skipped_units += 1;
        } else {
            match parse_unit(&sections, header, &mut builder) {
                Ok(()) => {
                    let tree = builder.finish_unit();
                    stats.units += 1;
                    if !tree.is_balanced() {
                        stats.unbalanced_units += 1;
                    }
                    sink.unit_complete(tree, builder.dedup())?;
                }
                Err(e) => {
                    warn!("unit at 0x{:x}: {}", offset, e);
                    stats.failed_units += 1;
                }
            }
        }
        offset = header.end;
    }
    stats.definitions = builder.dedup().len();
    stats.replaced = builder.dedup().replaced_count();
    Ok(stats)
}

enum Step {
    Next,
    Done,
    UnknownCode(u64),
}

struct UnitState<'input> {
    header: UnitHeader,
    str_offsets_base: usize,
    addr_base: usize,
    low_pc: u64,
    line: Option<LineTable<'input>>,
}

struct Walker<'input, 'a, 'b> {
    sections: &'a Sections<'input>,
    unit: UnitState<'input>,
    builder: &'a mut TreeBuilder<'input, 'b>,
}

fn parse_unit<'input>(
    sections: &Sections<'input>,
    header: UnitHeader,
    builder: &mut TreeBuilder<'input, '_>,
) -> Result<()> {
    trace!(
        "unit at 0x{:x}: {} version {}",
        header.offset,
        header.unit_type,
        header.version
    );
    if let (Some(signature), Some(type_offset)) = (header.type_signature, header.type_offset) {
        trace!("type signature 0x{:016x} at 0x{:x}", signature, type_offset);
    }
    if let Some(dwo_id) = header.dwo_id {
        trace!("split unit id 0x{:016x}", dwo_id);
    }
    let abbrevs = abbrev::parse(sections.debug_abbrev, header.abbrev_offset)?;
    builder.start_unit(UnitInfo {
        version: header.version,
        address_size: header.address_size,
        offset: header.offset,
        ..Default::default()
    });
    let mut walker = Walker {
        sections,
        unit: UnitState {
            header,
            str_offsets_base: 0,
            addr_base: 0,
            low_pc: 0,
            line: None,
        },
        builder,
    };
    let mut r = sections.debug_info.range(header.entries..header.end);
    let mut step = walker.root(&mut r, &abbrevs);
    loop {
        match step {
            Ok(Step::Next) => {}
            Ok(Step::Done) => break,
            Ok(Step::UnknownCode(code)) => {
                return Err(format!("unknown abbreviation code {}", code).into());
            }
            Err(gimli::Error::UnexpectedEof(_)) => {
                debug!("unit at 0x{:x}: entries truncated", header.offset);
                break;
            }
            Err(e) => {
                warn!("unit at 0x{:x}: stopping at invalid entry: {}", header.offset, e);
                break;
            }
        }
        if r.is_empty() {
            break;
        }
        step = walker.entry(&mut r, &abbrevs);
    }
    Ok(())
}

impl<'input, 'a, 'b> Walker<'input, 'a, 'b> {
    fn root(&mut self, r: &mut Reader<'input>, abbrevs: &Abbreviations) -> gimli::Result<Step> {
        let code = r.read_uleb128()?;
        if code == 0 {
            return Ok(Step::Done);
        }
        let abbrev = match abbrevs.get(code) {
            Some(abbrev) => abbrev,
            None => return Ok(Step::UnknownCode(code)),
        };
        match abbrev.tag {
            gimli::DW_TAG_compile_unit
            | gimli::DW_TAG_partial_unit
            | gimli::DW_TAG_type_unit
            | gimli::DW_TAG_skeleton_unit => {}
            tag => debug!("unexpected unit root tag {}", tag),
        }

        let mut values = Vec::with_capacity(abbrev.attributes.len());
        for spec in &abbrev.attributes {
            if let Some(value) = form::read(r, spec.form, spec.implicit_const, &self.unit.header)? {
                values.push((*spec, value));
            }
        }

        // Other attributes may be indexed through these bases.
        for (spec, value) in &values {
            match spec.name {
                gimli::DW_AT_str_offsets_base => {
                    if let Some(base) = offset_value(*value) {
                        self.unit.str_offsets_base = base;
                    }
                }
                gimli::DW_AT_addr_base | gimli::DW_AT_GNU_addr_base => {
                    if let Some(base) = offset_value(*value) {
                        self.unit.addr_base = base;
                    }
                }
                _ => {}
            }
        }

        let mut info = UnitInfo {
            version: self.unit.header.version,
            address_size: self.unit.header.address_size,
            offset: self.unit.header.offset,
            ..Default::default()
        };
        let mut stmt_list = None;
        for (spec, value) in values {
            match spec.name {
                gimli::DW_AT_name => info.name = self.string(value).map(|name| name.text),
                gimli::DW_AT_comp_dir => info.comp_dir = self.string(value).map(|name| name.text),
                gimli::DW_AT_producer => info.producer = self.string(value).map(|name| name.text),
                DW_AT_GO_PACKAGE_NAME => {
                    info.package_name = self.string(value).map(|name| name.text)
                }
                gimli::DW_AT_language => {
                    info.language = value.udata().map(|lang| gimli::DwLang(lang as u16))
                }
                gimli::DW_AT_low_pc => {
                    info.low_pc = self.address(value);
                    self.unit.low_pc = info.low_pc.unwrap_or(0);
                }
                gimli::DW_AT_stmt_list => stmt_list = offset_value(value),
                gimli::DW_AT_str_offsets_base
                | gimli::DW_AT_addr_base
                | gimli::DW_AT_GNU_addr_base
                | gimli::DW_AT_high_pc
                | gimli::DW_AT_ranges
                | gimli::DW_AT_rnglists_base
                | gimli::DW_AT_loclists_base
                | gimli::DW_AT_GNU_ranges_base
                | gimli::DW_AT_GNU_dwo_id
                | gimli::DW_AT_GNU_dwo_name
                | gimli::DW_AT_dwo_name
                | gimli::DW_AT_GNU_pubnames
                | gimli::DW_AT_use_UTF8
                | gimli::DW_AT_macro_info
                | gimli::DW_AT_GNU_macros
                | gimli::DW_AT_macros
                | gimli::DW_AT_main_subprogram
                | gimli::DW_AT_identifier_case
                | gimli::DW_AT_entry_pc
                | gimli::DW_AT_sibling => {}
                name => debug!("unknown unit attribute: {} {:?}", name, value),
            }
        }

        if let Some(offset) = stmt_list {
            match LineTable::parse(self.sections.debug_line, offset, info.comp_dir.clone()) {
                Ok(table) => {
                    trace!("line program at 0x{:x}: {} files", offset, table.len());
                    self.unit.line = Some(table);
                }
                Err(e) => debug!("line program at 0x{:x}: {}", offset, e),
            }
        }
        *self.builder.info_mut() = info;

        if abbrev.has_children {
            self.builder.push_root();
            Ok(Step::Next)
        } else {
            Ok(Step::Done)
        }
    }

    fn entry(&mut self, r: &mut Reader<'input>, abbrevs: &Abbreviations) -> gimli::Result<Step> {
        if self.builder.depth() == 0 {
            return Ok(Step::Done);
        }
        let offset = r.offset_from(self.sections.debug_info);
        let code = r.read_uleb128()?;
        if code == 0 {
            self.builder.close();
            return Ok(Step::Next);
        }
        let abbrev = match abbrevs.get(code) {
            Some(abbrev) => abbrev,
            None => return Ok(Step::UnknownCode(code)),
        };

        let header = self.unit.header;
        let disposition = self.builder.open(ElementId::new(offset), abbrev.tag);
        let mut sibling = None;
        if disposition == Disposition::Skipped {
            for spec in &abbrev.attributes {
                if spec.name == gimli::DW_AT_sibling {
                    if let Some(AttrValue::Ref(offset)) =
                        form::read(r, spec.form, spec.implicit_const, &header)?
                    {
                        sibling = Some(offset);
                    }
                } else {
                    form::skip(r, spec.form, &header)?;
                }
            }
        } else {
            for spec in &abbrev.attributes {
                if let Some(value) = form::read(r, spec.form, spec.implicit_const, &header)? {
                    self.attribute(spec, value);
                }
            }
        }

        if !abbrev.has_children {
            self.builder.leaf();
            return Ok(Step::Next);
        }
        let position = r.offset_from(self.sections.debug_info);
        match sibling {
            Some(sibling) if sibling >= position && sibling <= header.end => {
                *r = self.sections.debug_info.range(sibling..header.end);
                self.builder.leaf();
            }
            Some(sibling) => {
                debug!("ignoring invalid sibling 0x{:x} at 0x{:x}", sibling, offset);
                self.builder.push();
            }
            None => self.builder.push(),
        }
        Ok(Step::Next)
    }

    fn attribute(&mut self, spec: &AttributeSpec, value: AttrValue<'input>) {
        let attr = match spec.name {
            gimli::DW_AT_name => self.string(value).map(Attr::Name),
            gimli::DW_AT_linkage_name | gimli::DW_AT_MIPS_linkage_name => {
                self.string(value).map(Attr::LinkageName)
            }
            gimli::DW_AT_byte_size => value.udata().map(Attr::ByteSize),
            gimli::DW_AT_bit_offset => value.udata().map(Attr::BitOffset),
            gimli::DW_AT_data_bit_offset => value.udata().map(Attr::DataBitOffset),
            gimli::DW_AT_bit_size => value.udata().map(Attr::BitSize),
            gimli::DW_AT_alignment => value.udata().map(Attr::Alignment),
            gimli::DW_AT_type => reference(value).map(Attr::Type),
            gimli::DW_AT_specification => reference(value).map(Attr::Specification),
            gimli::DW_AT_abstract_origin => reference(value).map(Attr::AbstractOrigin),
            gimli::DW_AT_low_pc => self.address(value).map(Attr::Address),
            gimli::DW_AT_location => self.location(spec.form, value),
            gimli::DW_AT_data_member_location => member_location(value, &self.unit.header),
            gimli::DW_AT_count => value.udata().map(Attr::Count),
            gimli::DW_AT_upper_bound => bound(spec.form, value).map(Attr::UpperBound),
            gimli::DW_AT_lower_bound => value.udata().map(Attr::LowerBound),
            gimli::DW_AT_const_value => value.sdata().map(Attr::ConstValue),
            gimli::DW_AT_accessibility => value
                .udata()
                .and_then(|access| Access::from_dwarf(gimli::DwAccess(access as u8)))
                .map(Attr::Accessibility),
            gimli::DW_AT_declaration => value.flag().map(Attr::Declaration),
            gimli::DW_AT_external => value.flag().map(Attr::External),
            gimli::DW_AT_artificial => value.flag().map(Attr::Artificial),
            gimli::DW_AT_encoding => value
                .udata()
                .map(|encoding| Attr::Encoding(gimli::DwAte(encoding as u8))),
            gimli::DW_AT_decl_file => value
                .udata()
                .and_then(|index| self.unit.line.as_ref()?.resolve(index))
                .map(Attr::DeclFile),
            gimli::DW_AT_decl_line => value.udata().map(|line| Attr::DeclLine(line as u32)),
            DW_AT_GO_KIND => value.udata().map(|kind| Attr::Go(GoAttr::Kind(kind))),
            DW_AT_GO_KEY => reference(value).map(|id| Attr::Go(GoAttr::Key(id))),
            DW_AT_GO_ELEM => reference(value).map(|id| Attr::Go(GoAttr::Elem(id))),
            DW_AT_GO_EMBEDDED_FIELD => value
                .flag()
                .map(|flag| Attr::Go(GoAttr::EmbeddedField(flag))),
            DW_AT_GO_RUNTIME_TYPE => self
                .address(value)
                .or_else(|| value.udata())
                .map(|address| Attr::Go(GoAttr::RuntimeType(address))),
            DW_AT_GO_DICT_INDEX => value
                .udata()
                .map(|index| Attr::Go(GoAttr::DictIndex(index))),
            gimli::DW_AT_sibling
            | gimli::DW_AT_decl_column
            | gimli::DW_AT_high_pc
            | gimli::DW_AT_ranges
            | gimli::DW_AT_frame_base
            | gimli::DW_AT_prototyped
            | gimli::DW_AT_inline
            | gimli::DW_AT_call_file
            | gimli::DW_AT_call_line
            | gimli::DW_AT_call_column
            | gimli::DW_AT_calling_convention
            | gimli::DW_AT_noreturn
            | gimli::DW_AT_object_pointer
            | gimli::DW_AT_containing_type
            | gimli::DW_AT_explicit
            | gimli::DW_AT_virtuality
            | gimli::DW_AT_vtable_elem_location
            | gimli::DW_AT_enum_class
            | gimli::DW_AT_export_symbols
            | gimli::DW_AT_defaulted
            | gimli::DW_AT_deleted
            | gimli::DW_AT_reference
            | gimli::DW_AT_rvalue_reference
            | gimli::DW_AT_main_subprogram
            | gimli::DW_AT_description
            | gimli::DW_AT_const_expr
            | gimli::DW_AT_GNU_all_call_sites
            | gimli::DW_AT_GNU_all_tail_call_sites
            | DW_AT_GNU_LOCVIEWS
            | DW_AT_GNU_ENTRY_VIEW => None,
            name => {
                debug!("unknown attribute at 0x{:x}: {} {:?}", self.unit.header.offset, name, value);
                None
            }
        };
        if let Some(attr) = attr {
            self.builder.set(attr);
        }
    }

    fn string(&self, value: AttrValue<'input>) -> Option<Name<'input>> {
        match value {
            AttrValue::String(s) => Some(Name::inline(s.to_string_lossy())),
            AttrValue::StrOffset(offset) => self.pooled(offset),
            AttrValue::LineStrOffset(offset) => {
                let s = section_string(self.sections.debug_line_str, offset)?;
                Some(Name::inline(s.to_string_lossy()))
            }
            AttrValue::StrIndex(index) => {
                let format = self.unit.header.format;
                let at = (index as usize)
                    .checked_mul(usize::from(format.word_size()))?
                    .checked_add(self.unit.str_offsets_base)?;
                let mut r = self.sections.debug_str_offsets;
                let offset = r.skip(at).and_then(|_| r.read_offset(format));
                match offset {
                    Ok(offset) => self.pooled(offset),
                    Err(_) => {
                        debug!("string index {} out of range", index);
                        None
                    }
                }
            }
            _ => None,
        }
    }

    fn pooled(&self, offset: usize) -> Option<Name<'input>> {
        let s = section_string(self.sections.debug_str, offset)?;
        Some(Name::pooled(s.to_string_lossy(), offset))
    }

    fn address(&self, value: AttrValue<'input>) -> Option<u64> {
        match value {
            AttrValue::Addr(address) => Some(address),
            AttrValue::AddrIndex(index) => {
                let address_size = self.unit.header.address_size;
                let at = (index as usize)
                    .checked_mul(usize::from(address_size))?
                    .checked_add(self.unit.addr_base)?;
                let mut r = self.sections.debug_addr;
                match r.skip(at).and_then(|_| r.read_address(address_size)) {
                    Ok(address) => Some(address),
                    Err(_) => {
                        debug!("address index {} out of range", index);
                        None
                    }
                }
            }
            _ => None,
        }
    }

    fn location(&self, form: gimli::DwForm, value: AttrValue<'input>) -> Option<Attr<'input>> {
        let header = &self.unit.header;
        match value {
            AttrValue::Exprloc(expression) | AttrValue::Block(expression) => {
                Some(match expr::decode(expression, header.address_size) {
                    Expression::Address(address) => Attr::Address(address),
                    Expression::Locations(locations) => Attr::Location(locations),
                })
            }
            AttrValue::SecOffset(offset) => self.location_list(offset),
            AttrValue::Udata(offset)
                if header.version <= 3
                    && (form == gimli::DW_FORM_data4 || form == gimli::DW_FORM_data8) =>
            {
                self.location_list(offset as usize)
            }
            AttrValue::ListIndex(_) => {
                debug!("location list indices are not supported");
                None
            }
            _ => None,
        }
    }

    fn location_list(&self, offset: usize) -> Option<Attr<'input>> {
        let header = &self.unit.header;
        if header.version >= 5 {
            debug!("unit at 0x{:x}: .debug_loclists is not supported", header.offset);
            return None;
        }
        match expr::location_list(
            self.sections.debug_loc,
            offset,
            header.address_size,
            self.unit.low_pc,
        ) {
            Ok(ranges) => Some(Attr::LocationList(ranges)),
            Err(e) => {
                debug!("location list at 0x{:x}: {}", offset, e);
                None
            }
        }
    }
}

fn section_string(section: Reader, offset: usize) -> Option<Reader> {
    if offset >= section.len() {
        debug!("string offset 0x{:x} out of range", offset);
        return None;
    }
    section.range_from(offset..).read_null_terminated_slice().ok()
}

fn offset_value(value: AttrValue) -> Option<usize> {
    match value {
        AttrValue::SecOffset(offset) => Some(offset),
        AttrValue::Udata(offset) => Some(offset as usize),
        _ => None,
    }
}

fn reference(value: AttrValue) -> Option<ElementId> {
    match value {
        AttrValue::Ref(offset) => Some(ElementId::new(offset)),
        AttrValue::Sig8(signature) => {
            debug!("type signature reference 0x{:x} not supported", signature);
            None
        }
        _ => None,
    }
}

/// A signed bound. Fixed size data forms with all bits set are -1.
fn bound(form: gimli::DwForm, value: AttrValue) -> Option<i64> {
    let all_ones = match form {
        gimli::DW_FORM_data1 => 0xff,
        gimli::DW_FORM_data2 => 0xffff,
        gimli::DW_FORM_data4 => 0xffff_ffff,
        _ => return value.sdata(),
    };
    match value {
        AttrValue::Udata(value) if value == all_ones => Some(-1),
        _ => value.sdata(),
    }
}

fn member_location<'input>(value: AttrValue<'input>, header: &UnitHeader) -> Option<Attr<'input>> {
    match value {
        AttrValue::Exprloc(expression) | AttrValue::Block(expression) => {
            match expr::decode(expression, header.address_size) {
                Expression::Locations(locations) => {
                    location::member_offset(&locations).map(Attr::MemberOffset)
                }
                Expression::Address(_) => None,
            }
        }
        _ => value.udata().map(Attr::MemberOffset),
    }
}
