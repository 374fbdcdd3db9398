//! Attribute value decoding.

use std::convert::TryFrom;

use gimli::Reader as _;

use super::{read_u24, Reader, UnitHeader};

/// A raw attribute value.
///
/// Indexed strings and addresses are kept as indices, since the bases they
/// are resolved against may appear later in the same entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttrValue<'input> {
    Udata(u64),
    Sdata(i64),
    Addr(u64),
    AddrIndex(u64),
    String(Reader<'input>),
    /// An offset into `.debug_str`.
    StrOffset(usize),
    /// An offset into `.debug_line_str`.
    LineStrOffset(usize),
    StrIndex(u64),
    Block(Reader<'input>),
    Exprloc(Reader<'input>),
    SecOffset(usize),
    Flag(bool),
    /// A `.debug_info` offset.
    Ref(usize),
    Sig8(u64),
    /// A reference into a supplementary object file.
    Sup(usize),
    Data16(Reader<'input>),
    /// An index into `.debug_loclists` or `.debug_rnglists`.
    ListIndex(u64),
}

impl<'input> AttrValue<'input> {
    /// The value as an unsigned constant.
    pub(crate) fn udata(&self) -> Option<u64> {
        match *self {
            AttrValue::Udata(value) => Some(value),
            AttrValue::Sdata(value) if value >= 0 => Some(value as u64),
            _ => None,
        }
    }

    /// The value as a signed constant.
    pub(crate) fn sdata(&self) -> Option<i64> {
        match *self {
            AttrValue::Udata(value) => Some(value as i64),
            AttrValue::Sdata(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn flag(&self) -> Option<bool> {
        match *self {
            AttrValue::Flag(flag) => Some(flag),
            AttrValue::Udata(value) => Some(value != 0),
            _ => None,
        }
    }
}

/// Decode the value of one attribute and advance past it.
///
/// Returns `Ok(None)` for a form that is not supported. The cursor is then
/// advanced by the offset size, which may not be the real width.
pub(crate) fn read<'input>(
    r: &mut Reader<'input>,
    form: gimli::DwForm,
    implicit_const: i64,
    unit: &UnitHeader,
) -> gimli::Result<Option<AttrValue<'input>>> {
    let mut form = form;
    let offset_size = unit.format.word_size();
    let value = loop {
        let value = match form {
            gimli::DW_FORM_addr => AttrValue::Addr(r.read_address(unit.address_size)?),
            gimli::DW_FORM_block1 => {
                let len = r.read_u8()?;
                AttrValue::Block(r.split(usize::from(len))?)
            }
            gimli::DW_FORM_block2 => {
                let len = r.read_u16()?;
                AttrValue::Block(r.split(usize::from(len))?)
            }
            gimli::DW_FORM_block4 => {
                let len = r.read_u32()?;
                AttrValue::Block(r.split(len as usize)?)
            }
            gimli::DW_FORM_block => {
                let len = r.read_uleb128()?;
                AttrValue::Block(r.split(len as usize)?)
            }
            gimli::DW_FORM_exprloc => {
                let len = r.read_uleb128()?;
                AttrValue::Exprloc(r.split(len as usize)?)
            }
            gimli::DW_FORM_data1 => AttrValue::Udata(r.read_u8()?.into()),
            gimli::DW_FORM_data2 => AttrValue::Udata(r.read_u16()?.into()),
            gimli::DW_FORM_data4 => AttrValue::Udata(r.read_u32()?.into()),
            gimli::DW_FORM_data8 => AttrValue::Udata(r.read_u64()?),
            gimli::DW_FORM_data16 => AttrValue::Data16(r.split(16)?),
            gimli::DW_FORM_sdata => AttrValue::Sdata(r.read_sleb128()?),
            gimli::DW_FORM_udata => AttrValue::Udata(r.read_uleb128()?),
            gimli::DW_FORM_implicit_const => AttrValue::Sdata(implicit_const),
            gimli::DW_FORM_string => AttrValue::String(r.read_null_terminated_slice()?),
            gimli::DW_FORM_strp => AttrValue::StrOffset(r.read_offset(unit.format)?),
            gimli::DW_FORM_line_strp => AttrValue::LineStrOffset(r.read_offset(unit.format)?),
            gimli::DW_FORM_strx | gimli::DW_FORM_GNU_str_index => {
                AttrValue::StrIndex(r.read_uleb128()?)
            }
            gimli::DW_FORM_strx1 => AttrValue::StrIndex(r.read_u8()?.into()),
            gimli::DW_FORM_strx2 => AttrValue::StrIndex(r.read_u16()?.into()),
            gimli::DW_FORM_strx3 => AttrValue::StrIndex(read_u24(r)?.into()),
            gimli::DW_FORM_strx4 => AttrValue::StrIndex(r.read_u32()?.into()),
            gimli::DW_FORM_addrx | gimli::DW_FORM_GNU_addr_index => {
                AttrValue::AddrIndex(r.read_uleb128()?)
            }
            gimli::DW_FORM_addrx1 => AttrValue::AddrIndex(r.read_u8()?.into()),
            gimli::DW_FORM_addrx2 => AttrValue::AddrIndex(r.read_u16()?.into()),
            gimli::DW_FORM_addrx3 => AttrValue::AddrIndex(read_u24(r)?.into()),
            gimli::DW_FORM_addrx4 => AttrValue::AddrIndex(r.read_u32()?.into()),
            gimli::DW_FORM_sec_offset => AttrValue::SecOffset(r.read_offset(unit.format)?),
            gimli::DW_FORM_loclistx | gimli::DW_FORM_rnglistx => {
                AttrValue::ListIndex(r.read_uleb128()?)
            }
            gimli::DW_FORM_flag => AttrValue::Flag(r.read_u8()? != 0),
            gimli::DW_FORM_flag_present => AttrValue::Flag(true),
            // Unit relative references are made global so they can be
            // compared against element ids.
            gimli::DW_FORM_ref1 => return Ok(unit_ref(unit, r.read_u8()?.into())),
            gimli::DW_FORM_ref2 => return Ok(unit_ref(unit, r.read_u16()?.into())),
            gimli::DW_FORM_ref4 => return Ok(unit_ref(unit, r.read_u32()?.into())),
            gimli::DW_FORM_ref8 => return Ok(unit_ref(unit, r.read_u64()?)),
            gimli::DW_FORM_ref_udata => return Ok(unit_ref(unit, r.read_uleb128()?)),
            gimli::DW_FORM_ref_addr => {
                // DWARF 2 used the address size here.
                let offset = if unit.version == 2 {
                    r.read_sized_offset(unit.address_size)?
                } else {
                    r.read_offset(unit.format)?
                };
                AttrValue::Ref(offset)
            }
            gimli::DW_FORM_ref_sig8 => AttrValue::Sig8(r.read_u64()?),
            gimli::DW_FORM_ref_sup4 => AttrValue::Sup(r.read_u32()? as usize),
            gimli::DW_FORM_ref_sup8 => AttrValue::Sup(r.read_u64()? as usize),
            gimli::DW_FORM_strp_sup | gimli::DW_FORM_GNU_ref_alt | gimli::DW_FORM_GNU_strp_alt => {
                AttrValue::Sup(r.read_offset(unit.format)?)
            }
            gimli::DW_FORM_indirect => {
                form = gimli::DwForm(r.read_uleb128_u16()?);
                continue;
            }
            _ => {
                warn!(
                    "unit at 0x{:x}: unsupported attribute form {}, skipping {} bytes",
                    unit.offset, form, offset_size
                );
                r.skip(usize::from(offset_size))?;
                return Ok(None);
            }
        };
        break value;
    };
    Ok(Some(value))
}

/// Make a unit relative reference global.
///
/// The value has already been consumed, so an out of range reference only
/// drops this attribute.
fn unit_ref<'input>(unit: &UnitHeader, value: u64) -> Option<AttrValue<'input>> {
    let offset = usize::try_from(value)
        .ok()
        .and_then(|value| unit.offset.checked_add(value));
    if offset.is_none() {
        debug!(
            "unit at 0x{:x}: reference 0x{:x} out of range",
            unit.offset, value
        );
    }
    offset.map(AttrValue::Ref)
}

/// The encoded width of a form, if it does not depend on the data.
pub(crate) fn fixed_size(form: gimli::DwForm, unit: &UnitHeader) -> Option<usize> {
    let offset_size = usize::from(unit.format.word_size());
    let size = match form {
        gimli::DW_FORM_flag_present | gimli::DW_FORM_implicit_const => 0,
        gimli::DW_FORM_data1
        | gimli::DW_FORM_ref1
        | gimli::DW_FORM_flag
        | gimli::DW_FORM_strx1
        | gimli::DW_FORM_addrx1 => 1,
        gimli::DW_FORM_data2 | gimli::DW_FORM_ref2 | gimli::DW_FORM_strx2 | gimli::DW_FORM_addrx2 => 2,
        gimli::DW_FORM_strx3 | gimli::DW_FORM_addrx3 => 3,
        gimli::DW_FORM_data4
        | gimli::DW_FORM_ref4
        | gimli::DW_FORM_ref_sup4
        | gimli::DW_FORM_strx4
        | gimli::DW_FORM_addrx4 => 4,
        gimli::DW_FORM_data8 | gimli::DW_FORM_ref8 | gimli::DW_FORM_ref_sig8 | gimli::DW_FORM_ref_sup8 => 8,
        gimli::DW_FORM_data16 => 16,
        gimli::DW_FORM_addr => usize::from(unit.address_size),
        gimli::DW_FORM_ref_addr if unit.version == 2 => usize::from(unit.address_size),
        gimli::DW_FORM_ref_addr
        | gimli::DW_FORM_sec_offset
        | gimli::DW_FORM_strp
        | gimli::DW_FORM_line_strp
        | gimli::DW_FORM_strp_sup
        | gimli::DW_FORM_GNU_ref_alt
        | gimli::DW_FORM_GNU_strp_alt => offset_size,
        _ => return None,
    };
    Some(size)
}

/// Advance past one attribute value without decoding it.
pub(crate) fn skip(
    r: &mut Reader,
    form: gimli::DwForm,
    unit: &UnitHeader,
) -> gimli::Result<bool> {
    if let Some(size) = fixed_size(form, unit) {
        r.skip(size)?;
        return Ok(true);
    }
    Ok(read(r, form, 0, unit)?.is_some())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::file::dwarf::test::{header, uleb, sleb};
    use gimli::Reader as _;
    use gimli::{EndianSlice, RunTimeEndian};

    #[test]
    fn mixed_form_widths() {
        let unit = header(4, gimli::Format::Dwarf32, 8);
        let mut buf = Vec::new();
        let mut forms = Vec::new();
        let mut push = |form: gimli::DwForm, bytes: &[u8], buf: &mut Vec<u8>| {
            forms.push((form, buf.len(), bytes.len()));
            buf.extend_from_slice(bytes);
        };
        push(gimli::DW_FORM_data1, &[1], &mut buf);
        push(gimli::DW_FORM_data2, &[1, 2], &mut buf);
        push(gimli::DW_FORM_strx3, &[1, 2, 3], &mut buf);
        push(gimli::DW_FORM_data4, &[1, 2, 3, 4], &mut buf);
        push(gimli::DW_FORM_data8, &[1; 8], &mut buf);
        push(gimli::DW_FORM_data16, &[1; 16], &mut buf);
        push(gimli::DW_FORM_udata, &uleb(300), &mut buf);
        push(gimli::DW_FORM_sdata, &sleb(-300), &mut buf);
        push(gimli::DW_FORM_string, b"abc\0", &mut buf);
        push(gimli::DW_FORM_strp, &[0; 4], &mut buf);
        push(gimli::DW_FORM_sec_offset, &[0; 4], &mut buf);
        push(gimli::DW_FORM_addr, &[0; 8], &mut buf);
        push(gimli::DW_FORM_block1, &[2, 9, 9], &mut buf);
        push(gimli::DW_FORM_block2, &[1, 0, 9], &mut buf);
        push(gimli::DW_FORM_block4, &[1, 0, 0, 0, 9], &mut buf);
        push(gimli::DW_FORM_exprloc, &[1, 0x9c], &mut buf);
        push(gimli::DW_FORM_flag, &[1], &mut buf);
        push(gimli::DW_FORM_flag_present, &[], &mut buf);
        push(gimli::DW_FORM_implicit_const, &[], &mut buf);
        push(gimli::DW_FORM_ref_udata, &uleb(0x81), &mut buf);
        push(gimli::DW_FORM_ref_addr, &[0; 4], &mut buf);
        push(gimli::DW_FORM_ref_sig8, &[0; 8], &mut buf);
        push(gimli::DW_FORM_addrx, &uleb(5), &mut buf);
        push(gimli::DW_FORM_strx4, &[0; 4], &mut buf);
        buf.push(0xaa);

        let base = EndianSlice::new(&buf, RunTimeEndian::Little);
        let mut r = base;
        for &(form, start, len) in &forms {
            assert_eq!(r.offset_from(base), start, "{}", form);
            read(&mut r, form, 7, &unit).unwrap().unwrap();
            assert_eq!(r.offset_from(base), start + len, "{}", form);
        }
        assert_eq!(r.read_u8().unwrap(), 0xaa);

        let mut r = base;
        for &(form, _, _) in &forms {
            assert!(skip(&mut r, form, &unit).unwrap());
        }
        assert_eq!(r.read_u8().unwrap(), 0xaa);
    }

    #[test]
    fn references_out_of_range() {
        let unit = header(4, gimli::Format::Dwarf32, 8);
        let mut buf = vec![0xff; 8];
        buf.extend(uleb(u64::max_value()));
        buf.push(0xaa);
        let mut r = EndianSlice::new(&buf, RunTimeEndian::Little);
        assert_eq!(read(&mut r, gimli::DW_FORM_ref8, 0, &unit).unwrap(), None);
        assert_eq!(read(&mut r, gimli::DW_FORM_ref_udata, 0, &unit).unwrap(), None);
        assert_eq!(r.read_u8().unwrap(), 0xaa);

        // Skipping consumes the same bytes.
        let mut r = EndianSlice::new(&buf, RunTimeEndian::Little);
        assert!(skip(&mut r, gimli::DW_FORM_ref8, &unit).unwrap());
        assert!(!skip(&mut r, gimli::DW_FORM_ref_udata, &unit).unwrap());
        assert_eq!(r.read_u8().unwrap(), 0xaa);
    }

    #[test]
    fn values() {
        let unit = header(4, gimli::Format::Dwarf32, 4);
        let buf = [0x34, 0x12, 0xff, 0x7f, 0x10, 0x0b, 0x01];
        let mut r = EndianSlice::new(&buf, RunTimeEndian::Little);
        assert_eq!(
            read(&mut r, gimli::DW_FORM_data2, 0, &unit).unwrap(),
            Some(AttrValue::Udata(0x1234))
        );
        assert_eq!(
            read(&mut r, gimli::DW_FORM_sdata, 0, &unit).unwrap(),
            Some(AttrValue::Sdata(-1))
        );
        assert_eq!(
            read(&mut r, gimli::DW_FORM_ref1, 0, &unit).unwrap(),
            Some(AttrValue::Ref(unit.offset + 0x10))
        );
        // Indirect form, naming data1.
        assert_eq!(
            read(&mut r, gimli::DW_FORM_indirect, 0, &unit).unwrap(),
            Some(AttrValue::Udata(1))
        );
        assert_eq!(
            read(&mut r, gimli::DW_FORM_implicit_const, -5, &unit).unwrap(),
            Some(AttrValue::Sdata(-5))
        );
    }

    #[test]
    fn big_endian_strx3() {
        let unit = header(5, gimli::Format::Dwarf32, 8);
        let buf = [0x01, 0x02, 0x03];
        let mut r = EndianSlice::new(&buf, RunTimeEndian::Big);
        assert_eq!(
            read(&mut r, gimli::DW_FORM_strx3, 0, &unit).unwrap(),
            Some(AttrValue::StrIndex(0x010203))
        );
    }

    #[test]
    fn dwarf64_offsets() {
        let unit = header(4, gimli::Format::Dwarf64, 8);
        let buf = [0u8; 8];
        let mut r = EndianSlice::new(&buf, RunTimeEndian::Little);
        read(&mut r, gimli::DW_FORM_strp, 0, &unit).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn unsupported_form_skips_offset_size() {
        let unit = header(4, gimli::Format::Dwarf32, 8);
        let buf = [0u8; 6];
        let mut r = EndianSlice::new(&buf, RunTimeEndian::Little);
        assert_eq!(read(&mut r, gimli::DwForm(0x7f), 0, &unit).unwrap(), None);
        assert_eq!(r.len(), 2);
    }
}
