use std::borrow::Cow;

use gimli::Reader as _;

use super::Reader;

/// The file name table of one `.debug_line` program header.
///
/// Only the legacy (version 2 to 4) tables are read. For later versions the
/// table is left empty and every lookup fails.
#[derive(Debug, Default)]
pub(crate) struct LineTable<'input> {
    pub version: u16,
    directories: Vec<Cow<'input, str>>,
    files: Vec<(Cow<'input, str>, u64)>,
    comp_dir: Option<Cow<'input, str>>,
}

impl<'input> LineTable<'input> {
    pub(crate) fn parse(
        debug_line: Reader<'input>,
        offset: usize,
        comp_dir: Option<Cow<'input, str>>,
    ) -> gimli::Result<LineTable<'input>> {
        if offset >= debug_line.len() {
            return Err(gimli::Error::UnexpectedEof(debug_line.offset_id()));
        }
        let mut r = debug_line.range_from(offset..);
        let (length, format) = r.read_initial_length()?;
        let length = length as usize;
        if length > r.len() {
            debug!("line program at 0x{:x}: truncated", offset);
        }
        let mut r = r.split(length.min(r.len()))?;
        let version = r.read_u16()?;
        let mut table = LineTable {
            version,
            comp_dir,
            ..Default::default()
        };
        if version < 2 || version > 4 {
            if version == 5 {
                let _address_size = r.read_u8()?;
                let _segment_selector_size = r.read_u8()?;
            }
            debug!(
                "line program at 0x{:x}: version {} file names not supported",
                offset, version
            );
            return Ok(table);
        }

        let header_length = r.read_offset(format)?;
        let mut r = r.split(header_length.min(r.len()))?;
        let _minimum_instruction_length = r.read_u8()?;
        if version >= 4 {
            let _maximum_operations_per_instruction = r.read_u8()?;
        }
        let _default_is_stmt = r.read_u8()?;
        let _line_base = r.read_i8()?;
        let _line_range = r.read_u8()?;
        let opcode_base = r.read_u8()?;
        r.skip(usize::from(opcode_base.saturating_sub(1)))?;

        loop {
            let directory = r.read_null_terminated_slice()?;
            if directory.is_empty() {
                break;
            }
            table.directories.push(directory.to_string_lossy());
        }
        loop {
            let name = r.read_null_terminated_slice()?;
            if name.is_empty() {
                break;
            }
            let directory = r.read_uleb128()?;
            let _mtime = r.read_uleb128()?;
            let _length = r.read_uleb128()?;
            table.files.push((name.to_string_lossy(), directory));
        }
        Ok(table)
    }

    /// The number of file name entries.
    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }

    /// Return the `dir/name` path for a `DW_AT_decl_file` index.
    ///
    /// Indices are 1 based. Directory index 0 is the compilation directory.
    pub(crate) fn resolve(&self, index: u64) -> Option<String> {
        if index == 0 {
            return None;
        }
        let (name, directory) = self.files.get(index as usize - 1)?;
        if name.starts_with('/') {
            return Some(name.to_string());
        }
        let directory = if *directory == 0 {
            self.comp_dir.as_ref()
        } else {
            self.directories.get(*directory as usize - 1)
        };
        match directory {
            Some(directory) if !directory.is_empty() => {
                let mut path = String::with_capacity(directory.len() + 1 + name.len());
                path.push_str(directory);
                if !directory.ends_with('/') {
                    path.push('/');
                }
                path.push_str(name);
                Some(path)
            }
            _ => Some(name.to_string()),
        }
    }
}
