use fnv::FnvHashMap;
use gimli::Reader as _;

use super::Reader;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AttributeSpec {
    pub name: gimli::DwAt,
    pub form: gimli::DwForm,
    pub implicit_const: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Abbreviation {
    pub code: u64,
    pub tag: gimli::DwTag,
    pub has_children: bool,
    pub attributes: Vec<AttributeSpec>,
}

/// The abbreviations of one unit, by code.
#[derive(Debug, Default)]
pub(crate) struct Abbreviations {
    // Codes are usually assigned sequentially from 1.
    dense: Vec<Abbreviation>,
    sparse: FnvHashMap<u64, Abbreviation>,
}

impl Abbreviations {
    pub(crate) fn get(&self, code: u64) -> Option<&Abbreviation> {
        if code >= 1 && code <= self.dense.len() as u64 {
            Some(&self.dense[code as usize - 1])
        } else {
            self.sparse.get(&code)
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.dense.len() + self.sparse.len()
    }

    fn insert(&mut self, abbrev: Abbreviation) -> Result<()> {
        let code = abbrev.code;
        if code == self.dense.len() as u64 + 1 && !self.sparse.contains_key(&code) {
            self.dense.push(abbrev);
            return Ok(());
        }
        if self.get(code).is_some() {
            return Err(format!("duplicate abbreviation code {}", code).into());
        }
        self.sparse.insert(code, abbrev);
        Ok(())
    }
}

/// Parse the abbreviation table starting at `offset` in `.debug_abbrev`.
pub(crate) fn parse(debug_abbrev: Reader, offset: usize) -> Result<Abbreviations> {
    if offset >= debug_abbrev.len() {
        return Err(format!("abbreviation offset 0x{:x} out of bounds", offset).into());
    }
    let mut r = debug_abbrev.range_from(offset..);
    let mut abbrevs = Abbreviations::default();
    loop {
        let code = r.read_uleb128()?;
        if code == 0 {
            break;
        }
        let tag = gimli::DwTag(r.read_uleb128_u16()?);
        let has_children = match gimli::DwChildren(r.read_u8()?) {
            gimli::DW_CHILDREN_no => false,
            gimli::DW_CHILDREN_yes => true,
            children => {
                return Err(format!("invalid children flag {} for code {}", children.0, code).into())
            }
        };
        let mut attributes = Vec::new();
        loop {
            let name = r.read_uleb128_u16()?;
            let form = r.read_uleb128_u16()?;
            if name == 0 && form == 0 {
                break;
            }
            let form = gimli::DwForm(form);
            let implicit_const = if form == gimli::DW_FORM_implicit_const {
                r.read_sleb128()?
            } else {
                0
            };
            attributes.push(AttributeSpec {
                name: gimli::DwAt(name),
                form,
                implicit_const,
            });
        }
        abbrevs.insert(Abbreviation {
            code,
            tag,
            has_children,
            attributes,
        })?;
    }
    Ok(abbrevs)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::file::dwarf::test::uleb;
    use gimli::{EndianSlice, RunTimeEndian};

    fn abbrev(code: u64, tag: gimli::DwTag, children: bool, attrs: &[(gimli::DwAt, gimli::DwForm)]) -> Vec<u8> {
        let mut buf = uleb(code);
        buf.extend(uleb(tag.0.into()));
        buf.push(children as u8);
        for (name, form) in attrs {
            buf.extend(uleb(name.0.into()));
            buf.extend(uleb(form.0.into()));
            if *form == gimli::DW_FORM_implicit_const {
                buf.push(0x7e);
            }
        }
        buf.extend(&[0, 0]);
        buf
    }

    #[test]
    fn parse_table() {
        let mut buf = vec![0xff];
        buf.extend(abbrev(
            1,
            gimli::DW_TAG_compile_unit,
            true,
            &[(gimli::DW_AT_name, gimli::DW_FORM_string)],
        ));
        buf.extend(abbrev(
            7,
            gimli::DW_TAG_base_type,
            false,
            &[
                (gimli::DW_AT_byte_size, gimli::DW_FORM_implicit_const),
                (gimli::DW_AT_name, gimli::DW_FORM_strp),
            ],
        ));
        buf.push(0);
        let abbrevs = parse(EndianSlice::new(&buf, RunTimeEndian::Little), 1).unwrap();
        assert_eq!(abbrevs.len(), 2);
        let cu = abbrevs.get(1).unwrap();
        assert!(cu.has_children);
        assert_eq!(cu.tag, gimli::DW_TAG_compile_unit);
        let base = abbrevs.get(7).unwrap();
        assert!(!base.has_children);
        assert_eq!(base.attributes[0].implicit_const, -2);
        assert_eq!(base.attributes[1].form, gimli::DW_FORM_strp);
        assert!(abbrevs.get(2).is_none());
        assert!(abbrevs.get(0).is_none());
    }

    #[test]
    fn duplicate_code() {
        let mut buf = abbrev(1, gimli::DW_TAG_compile_unit, true, &[]);
        buf.extend(abbrev(2, gimli::DW_TAG_base_type, false, &[]));
        buf.extend(abbrev(2, gimli::DW_TAG_typedef, false, &[]));
        buf.push(0);
        assert!(parse(EndianSlice::new(&buf, RunTimeEndian::Little), 0).is_err());

        let mut buf = abbrev(5, gimli::DW_TAG_compile_unit, true, &[]);
        buf.extend(abbrev(5, gimli::DW_TAG_base_type, false, &[]));
        buf.push(0);
        assert!(parse(EndianSlice::new(&buf, RunTimeEndian::Little), 0).is_err());
    }

    #[test]
    fn bad_offset() {
        let buf = [0u8; 4];
        assert!(parse(EndianSlice::new(&buf, RunTimeEndian::Little), 4).is_err());
        assert_eq!(
            parse(EndianSlice::new(&buf, RunTimeEndian::Little), 0).unwrap().len(),
            0
        );
    }
}
