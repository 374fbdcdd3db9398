use std::borrow::Cow;
use std::fs;
use std::path::Path;

pub(crate) mod compress;
mod dwarf;
pub(crate) mod reloc;
pub(crate) mod reloc_table;

use fnv::FnvHashSet;
use object::read::elf::{ElfFile, FileHeader};
use object::{Object, ObjectSection, ObjectSymbol};

use self::compress::{decompress, Compression};
use self::reloc::{apply_relocations, DebugSection, Relocation, RelocationSection, Target};
use crate::options::Options;
use crate::{Result, Sink};

const SHF_COMPRESSED: u64 = 0x800;

/// The debug sections the walker reads, with their byte order.
///
/// Missing sections are empty.
#[derive(Debug)]
pub struct DebugSections<'data> {
    pub endian: gimli::RunTimeEndian,
    pub debug_info: Cow<'data, [u8]>,
    pub debug_abbrev: Cow<'data, [u8]>,
    pub debug_str: Cow<'data, [u8]>,
    pub debug_str_offsets: Cow<'data, [u8]>,
    pub debug_addr: Cow<'data, [u8]>,
    pub debug_loc: Cow<'data, [u8]>,
    pub debug_line: Cow<'data, [u8]>,
    pub debug_line_str: Cow<'data, [u8]>,
}

impl<'data> DebugSections<'data> {
    pub fn new(endian: gimli::RunTimeEndian) -> Self {
        let empty = || Cow::Borrowed(&[][..]);
        DebugSections {
            endian,
            debug_info: empty(),
            debug_abbrev: empty(),
            debug_str: empty(),
            debug_str_offsets: empty(),
            debug_addr: empty(),
            debug_loc: empty(),
            debug_line: empty(),
            debug_line_str: empty(),
        }
    }

    /// Store the bytes of the section called `name`.
    ///
    /// Both `.debug_*` and `.zdebug_*` names are accepted. Returns false if
    /// the section is not one that is read.
    pub fn set<D>(&mut self, name: &str, data: D) -> bool
    where
        D: Into<Cow<'data, [u8]>>,
    {
        match self.slot(name) {
            Some(slot) => {
                *slot = data.into();
                true
            }
            None => false,
        }
    }

    fn slot(&mut self, name: &str) -> Option<&mut Cow<'data, [u8]>> {
        let slot = match canonical_name(name)? {
            ".debug_info" => &mut self.debug_info,
            ".debug_abbrev" => &mut self.debug_abbrev,
            ".debug_str" => &mut self.debug_str,
            ".debug_str_offsets" => &mut self.debug_str_offsets,
            ".debug_addr" => &mut self.debug_addr,
            ".debug_loc" => &mut self.debug_loc,
            ".debug_line" => &mut self.debug_line,
            ".debug_line_str" => &mut self.debug_line_str,
            _ => return None,
        };
        Some(slot)
    }
}

fn canonical_name(name: &str) -> Option<&'static str> {
    let suffix = match name.strip_prefix(".zdebug_") {
        Some(suffix) => suffix,
        None => name.strip_prefix(".debug_")?,
    };
    DEBUG_NAMES
        .iter()
        .copied()
        .find(|known| known[".debug_".len()..] == *suffix)
}

const DEBUG_NAMES: &[&str] = &[
    ".debug_info",
    ".debug_abbrev",
    ".debug_str",
    ".debug_str_offsets",
    ".debug_addr",
    ".debug_loc",
    ".debug_line",
    ".debug_line_str",
];

/// Counters for one decoding session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseStats {
    /// Units decoded and handed to the sink.
    pub units: usize,
    /// Units abandoned because of a malformed header, abbreviation table or entry.
    pub failed_units: usize,
    /// Units with an unsupported DWARF version.
    pub skipped_units: usize,
    /// Units whose entry stream did not close every scope.
    pub unbalanced_units: usize,
    /// Entries in the dedup table at the end of the session.
    pub definitions: usize,
    /// Definitions replaced by an earlier identical definition.
    pub replaced: usize,
    /// Relocations applied to debug sections.
    pub relocations: usize,
}

/// Decode sections that are already in memory.
pub fn parse_sections<'input, S>(
    sections: &'input DebugSections,
    options: &Options,
    sink: &mut S,
) -> Result<ParseStats>
where
    S: Sink<'input>,
{
    dwarf::parse(sections, options, sink)
}

/// An ELF file on disk.
pub struct File;

impl File {
    /// Memory map the file at `path` and decode its debug information.
    pub fn parse<P, S>(path: P, options: &Options, sink: &mut S) -> Result<ParseStats>
    where
        P: AsRef<Path>,
        S: for<'a> Sink<'a>,
    {
        let handle = match fs::File::open(path.as_ref()) {
            Ok(handle) => handle,
            Err(e) => {
                return Err(format!("open failed: {}", e).into());
            }
        };

        let map = match unsafe { memmap2::Mmap::map(&handle) } {
            Ok(map) => map,
            Err(e) => {
                return Err(format!("memmap failed: {}", e).into());
            }
        };

        let input = &*map;
        let (sections, relocations) = match object::FileKind::parse(input)? {
            object::FileKind::Elf32 => {
                load::<object::elf::FileHeader32<object::Endianness>>(input, options)?
            }
            object::FileKind::Elf64 => {
                load::<object::elf::FileHeader64<object::Endianness>>(input, options)?
            }
            kind => return Err(format!("unsupported file format {:?}", kind).into()),
        };
        let mut stats = parse_sections(&sections, options, sink)?;
        stats.relocations = relocations;
        Ok(stats)
    }
}

fn load<'data, Elf>(
    input: &'data [u8],
    options: &Options,
) -> Result<(DebugSections<'data>, usize)>
where
    Elf: FileHeader<Endian = object::Endianness>,
{
    let elf = ElfFile::<Elf>::parse(input)?;
    let endian = if elf.is_little_endian() {
        gimli::RunTimeEndian::Little
    } else {
        gimli::RunTimeEndian::Big
    };
    let is_64 = elf.is_64();

    let mut debug = Vec::new();
    for section in elf.sections() {
        let name = match section.name() {
            Ok(name) => name,
            Err(_) => continue,
        };
        let canonical = match canonical_name(name) {
            Some(canonical) => canonical,
            None => continue,
        };
        let data = match section.data() {
            Ok(data) => data,
            Err(e) => {
                warn!("{}: unreadable section data: {}", name, e);
                continue;
            }
        };
        let compression = match section.flags() {
            object::SectionFlags::Elf { sh_flags } if sh_flags & SHF_COMPRESSED != 0 => {
                Compression::Elf { is_64 }
            }
            _ if name.starts_with(".zdebug_") => Compression::Legacy,
            _ => Compression::None,
        };
        match decompress(data, compression, endian) {
            Some(data) => debug.push((section.index().0, canonical, data)),
            None => warn!("{}: ignoring section", name),
        }
    }

    let mut relocations = 0;
    if elf.kind() == object::ObjectKind::Relocatable && options.relocations {
        let header = elf.elf_header();
        let target = Target {
            machine: header.e_machine(elf.endian()),
            flags: header.e_flags(elf.endian()),
            endian,
        };
        let mut reloc_sections = Vec::new();
        for section in elf.sections() {
            if !debug.iter().any(|(index, _, _)| *index == section.index().0) {
                continue;
            }
            let mut list = Vec::new();
            for (offset, relocation) in section.relocations() {
                let r_type = match relocation.flags() {
                    object::RelocationFlags::Elf { r_type } => r_type,
                    _ => continue,
                };
                let symbol = match relocation.target() {
                    object::RelocationTarget::Symbol(symbol) => symbol.0,
                    object::RelocationTarget::Absolute => 0,
                    _ => continue,
                };
                list.push(Relocation {
                    offset,
                    symbol,
                    r_type,
                    addend: if relocation.has_implicit_addend() {
                        None
                    } else {
                        Some(relocation.addend())
                    },
                });
            }
            if !list.is_empty() {
                reloc_sections.push(RelocationSection {
                    target: section.index().0,
                    relocations: list,
                });
            }
        }

        if !reloc_sections.is_empty() {
            let symbols = elf.symbol_table().map(|_| {
                let mut values = Vec::new();
                for symbol in elf.symbols() {
                    let index = symbol.index().0;
                    if values.len() <= index {
                        values.resize(index + 1, 0);
                    }
                    values[index] = symbol.address();
                }
                values
            });
            let mut patched: Vec<DebugSection> = debug
                .iter_mut()
                .map(|(index, name, data)| DebugSection {
                    index: *index,
                    name: (*name).to_string(),
                    data: std::mem::take(data).into_owned(),
                })
                .collect();
            relocations = apply_relocations(
                &target,
                &mut patched,
                &reloc_sections,
                symbols.as_deref(),
            );
            for (entry, section) in debug.iter_mut().zip(patched) {
                entry.2 = Cow::Owned(section.data);
            }
        }
    }

    Ok((collect_sections(endian, debug), relocations))
}

/// Store each decoded section under its canonical name.
///
/// A file may carry a section twice; the last one is kept.
fn collect_sections<'data>(
    endian: gimli::RunTimeEndian,
    debug: Vec<(usize, &'static str, Cow<'data, [u8]>)>,
) -> DebugSections<'data> {
    let mut sections = DebugSections::new(endian);
    let mut seen = FnvHashSet::default();
    for (index, name, data) in debug {
        if !seen.insert(name) {
            warn!(
                "{}: duplicate section at index {}, replacing the earlier one",
                name, index
            );
        }
        sections.set(name, data);
    }
    sections
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn duplicate_sections_keep_last() {
        let debug = vec![
            (2, ".debug_info", Cow::Borrowed(&[1u8][..])),
            (3, ".debug_abbrev", Cow::Borrowed(&[2u8][..])),
            (4, ".debug_info", Cow::Owned(vec![3u8, 4])),
        ];
        let sections = collect_sections(gimli::RunTimeEndian::Little, debug);
        assert_eq!(&*sections.debug_info, &[3, 4]);
        assert_eq!(&*sections.debug_abbrev, &[2]);
    }

    #[test]
    fn section_names() {
        assert_eq!(canonical_name(".debug_info"), Some(".debug_info"));
        assert_eq!(canonical_name(".zdebug_line"), Some(".debug_line"));
        assert_eq!(canonical_name(".zdebug_bogus"), None);
        assert_eq!(canonical_name(".debug_ranges"), None);
        assert_eq!(canonical_name(".text"), None);

        let mut sections = DebugSections::new(gimli::RunTimeEndian::Little);
        assert!(sections.set(".zdebug_str", vec![1, 2]));
        assert!(sections.set(".debug_line_str", &[3][..]));
        assert!(!sections.set(".debug_ranges", &[4][..]));
        assert_eq!(&*sections.debug_str, &[1, 2]);
        assert_eq!(&*sections.debug_line_str, &[3]);
        assert!(sections.debug_info.is_empty());
    }

    #[test]
    fn missing_debug_info() {
        struct Nothing;
        impl<'input> Sink<'input> for Nothing {
            fn unit_complete(
                &mut self,
                _: crate::UnitTree<'input>,
                _: &crate::DedupTable<'input>,
            ) -> Result<()> {
                unreachable!()
            }
        }
        let sections = DebugSections::new(gimli::RunTimeEndian::Little);
        assert!(parse_sections(&sections, &Options::default(), &mut Nothing).is_err());
    }

    #[test]
    fn not_elf() {
        let path = std::env::temp_dir().join("dwtree-not-elf");
        fs::write(&path, b"not an object file").unwrap();
        struct Nothing;
        impl<'input> Sink<'input> for Nothing {
            fn unit_complete(
                &mut self,
                _: crate::UnitTree<'input>,
                _: &crate::DedupTable<'input>,
            ) -> Result<()> {
                Ok(())
            }
        }
        assert!(File::parse(&path, &Options::default(), &mut Nothing).is_err());
        let _ = fs::remove_file(&path);
        assert!(File::parse("/nonexistent/dwtree", &Options::default(), &mut Nothing).is_err());
    }
}
