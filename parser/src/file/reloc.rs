//! Resolve relocations in the debug sections of unlinked object files.

use fnv::FnvHashSet;
use object::elf;

use super::reloc_table::{self, classify, RelocationClass};

/// One relocation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Offset of the patched bytes within the target section.
    pub offset: u64,
    /// Index into the symbol table.
    pub symbol: usize,
    pub r_type: u32,
    /// The explicit addend, or `None` if the addend is stored in the
    /// patched bytes.
    pub addend: Option<i64>,
}

/// The relocations that apply to one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationSection {
    /// Section index of the section that is patched.
    pub target: usize,
    pub relocations: Vec<Relocation>,
}

/// The machine the object file was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// ELF `e_machine`.
    pub machine: u16,
    /// ELF `e_flags`.
    pub flags: u32,
    pub endian: gimli::RunTimeEndian,
}

/// A debug section whose bytes may be patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSection {
    /// Section index in the object file.
    pub index: usize,
    pub name: String,
    pub data: Vec<u8>,
}

// Machine numbers with relocation sequences.
const EM_MSP430_OLD: u16 = 0x1059;
const EM_CYGNUS_MN10300: u16 = 0xbeef;

/// Apply every relocation that targets one of `sections`.
///
/// `symbols` holds the value of each symbol by index. Relocations that
/// cannot be applied are logged and skipped. Returns the number of
/// relocations applied.
pub fn apply_relocations(
    target: &Target,
    sections: &mut [DebugSection],
    relocations: &[RelocationSection],
    symbols: Option<&[u64]>,
) -> usize {
    let mut engine = Engine {
        target: *target,
        symbols,
        sequence: Sequence::default(),
        warned: FnvHashSet::default(),
    };
    let mut count = 0;
    for relocation_section in relocations {
        let section = match sections
            .iter_mut()
            .find(|section| section.index == relocation_section.target)
        {
            Some(section) => section,
            None => continue,
        };
        engine.sequence = Sequence::default();
        for relocation in &relocation_section.relocations {
            match engine.apply(&mut section.data, relocation) {
                Ok(true) => count += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    "{}: skipping relocation at 0x{:x}: {}",
                    section.name, relocation.offset, e
                ),
            }
        }
    }
    count
}

/// State carried between the relocations of a sequence.
#[derive(Debug, Default)]
struct Sequence {
    // MSP430 and MN10300 SYM_DIFF.
    saved: Option<u64>,
    // RL78 operand stack.
    rl78_sym1: u64,
    rl78_sym2: u64,
    rl78_value: u64,
}

struct Engine<'a> {
    target: Target,
    symbols: Option<&'a [u64]>,
    sequence: Sequence,
    warned: FnvHashSet<(u16, u32)>,
}

type Result<T> = std::result::Result<T, &'static str>;

impl<'a> Engine<'a> {
    fn symbol(&self, index: usize) -> Result<u64> {
        let symbols = self.symbols.ok_or("missing symbol table")?;
        symbols
            .get(index)
            .copied()
            .ok_or("symbol index out of range")
    }

    fn apply(&mut self, data: &mut [u8], relocation: &Relocation) -> Result<bool> {
        if let Some(applied) = self.apply_sequence(data, relocation)? {
            return Ok(applied);
        }

        let class = match classify(self.target.machine, self.target.flags, relocation.r_type) {
            Some(class) => class,
            None => {
                if self.warned.insert((self.target.machine, relocation.r_type)) {
                    warn!(
                        "unsupported relocation type {} for machine {}",
                        relocation.r_type, self.target.machine
                    );
                }
                return Ok(false);
            }
        };
        let width = match class {
            RelocationClass::None => return Ok(false),
            RelocationClass::Abs(width)
            | RelocationClass::PcRel(width)
            | RelocationClass::Add(width)
            | RelocationClass::Sub(width) => width,
            RelocationClass::Set6 | RelocationClass::Add6 | RelocationClass::Sub6 => 1,
        };

        let offset = checked_offset(data, relocation.offset, width)?;
        let symbol = self.symbol(relocation.symbol)?;
        let existing = read(&data[offset..], width, self.target.endian);
        let addend = match (relocation.addend, class) {
            (Some(addend), _) => addend as u64,
            (None, RelocationClass::Abs(_)) | (None, RelocationClass::PcRel(_)) => existing,
            (None, _) => 0,
        };
        let value = symbol.wrapping_add(addend);
        let result = match class {
            RelocationClass::Abs(_) => value,
            RelocationClass::PcRel(_) => value.wrapping_sub(relocation.offset),
            RelocationClass::Add(_) => existing.wrapping_add(value),
            RelocationClass::Sub(_) => existing.wrapping_sub(value),
            RelocationClass::Set6 => (existing & 0xc0) | (value & 0x3f),
            RelocationClass::Add6 => (existing & 0xc0) | (existing.wrapping_add(value) & 0x3f),
            RelocationClass::Sub6 => (existing & 0xc0) | (existing.wrapping_sub(value) & 0x3f),
            RelocationClass::None => return Ok(false),
        };
        write(&mut data[offset..], width, result, self.target.endian);
        Ok(true)
    }

    /// Handle the machines whose relocations combine several entries.
    ///
    /// Returns `None` if the relocation is not part of a sequence.
    fn apply_sequence(
        &mut self,
        data: &mut [u8],
        relocation: &Relocation,
    ) -> Result<Option<bool>> {
        let addend = relocation.addend.unwrap_or(0) as u64;
        match self.target.machine {
            elf::EM_MSP430 | EM_MSP430_OLD => {
                let msp430x = reloc_table::is_msp430x(self.target.machine, self.target.flags);
                let diff = match relocation.r_type {
                    10 | 12 if !msp430x => return self.save(relocation),
                    10 | 12 => false,
                    21 | 23 => return self.save(relocation),
                    1 | 3 => true,
                    5 | 9 | 11 => !msp430x,
                    2 | 15 | 22 => msp430x,
                    r_type => {
                        if self.sequence.saved.take().is_some() {
                            warn!("unhandled MSP430 relocation type {} after SYM_DIFF", r_type);
                        }
                        false
                    }
                };
                if !diff {
                    return Ok(None);
                }
                let saved = match self.sequence.saved.take() {
                    Some(saved) => saved,
                    None => return Ok(None),
                };
                let width = match relocation.r_type {
                    1 => 4,
                    11 | 22 => return Err("ULEB128 symbol difference not supported"),
                    _ => 2,
                };
                let symbol = self.symbol(relocation.symbol)?;
                let value = addend.wrapping_add(symbol.wrapping_sub(saved));
                self.put(data, relocation.offset, width, value).map(Some)
            }
            elf::EM_MN10300 | EM_CYGNUS_MN10300 => match relocation.r_type {
                34 => Ok(Some(false)),
                33 => self.save(relocation),
                1 | 2 => {
                    let saved = match self.sequence.saved.take() {
                        Some(saved) => saved,
                        None => return Ok(None),
                    };
                    let width = if relocation.r_type == 1 { 4 } else { 2 };
                    let value =
                        addend.wrapping_add(self.symbol(relocation.symbol)?.wrapping_sub(saved));
                    self.put(data, relocation.offset, width, value).map(Some)
                }
                r_type => {
                    if self.sequence.saved.take().is_some() {
                        warn!("unhandled MN10300 relocation type {} after SYM_DIFF", r_type);
                    }
                    Ok(None)
                }
            },
            elf::EM_RL78 => match relocation.r_type {
                0x80 => {
                    // R_RL78_SYM
                    self.sequence.rl78_sym1 = self.sequence.rl78_sym2;
                    self.sequence.rl78_sym2 = self.symbol(relocation.symbol)?.wrapping_add(addend);
                    Ok(Some(false))
                }
                0x83 => {
                    // R_RL78_OPsub
                    self.sequence.rl78_value =
                        self.sequence.rl78_sym1.wrapping_sub(self.sequence.rl78_sym2);
                    self.sequence.rl78_sym1 = 0;
                    self.sequence.rl78_sym2 = 0;
                    Ok(Some(false))
                }
                0x41 | 0x43 => {
                    // R_RL78_ABS32, R_RL78_ABS16
                    let width = if relocation.r_type == 0x41 { 4 } else { 2 };
                    let value = std::mem::take(&mut self.sequence.rl78_value);
                    self.put(data, relocation.offset, width, value).map(Some)
                }
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    fn save(&mut self, relocation: &Relocation) -> Result<Option<bool>> {
        self.sequence.saved = Some(self.symbol(relocation.symbol)?);
        Ok(Some(false))
    }

    fn put(&self, data: &mut [u8], offset: u64, width: u8, value: u64) -> Result<bool> {
        let offset = checked_offset(data, offset, width)?;
        write(&mut data[offset..], width, value, self.target.endian);
        Ok(true)
    }
}

fn checked_offset(data: &[u8], offset: u64, width: u8) -> Result<usize> {
    let end = offset
        .checked_add(u64::from(width))
        .ok_or("offset out of range")?;
    if end > data.len() as u64 {
        return Err("offset out of range");
    }
    Ok(offset as usize)
}

fn read(data: &[u8], width: u8, endian: gimli::RunTimeEndian) -> u64 {
    let bytes = &data[..usize::from(width)];
    let mut value = 0;
    match endian {
        gimli::RunTimeEndian::Little => {
            for byte in bytes.iter().rev() {
                value = (value << 8) | u64::from(*byte);
            }
        }
        gimli::RunTimeEndian::Big => {
            for byte in bytes {
                value = (value << 8) | u64::from(*byte);
            }
        }
    }
    value
}

fn write(data: &mut [u8], width: u8, value: u64, endian: gimli::RunTimeEndian) {
    let width = usize::from(width);
    for i in 0..width {
        let byte = (value >> (8 * i)) as u8;
        match endian {
            gimli::RunTimeEndian::Little => data[i] = byte,
            gimli::RunTimeEndian::Big => data[width - 1 - i] = byte,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use gimli::RunTimeEndian;

    fn section(data: Vec<u8>) -> DebugSection {
        DebugSection {
            index: 3,
            name: ".debug_info".into(),
            data,
        }
    }

    fn relocs(list: Vec<(u64, usize, u32, Option<i64>)>) -> Vec<RelocationSection> {
        vec![RelocationSection {
            target: 3,
            relocations: list
                .into_iter()
                .map(|(offset, symbol, r_type, addend)| Relocation {
                    offset,
                    symbol,
                    r_type,
                    addend,
                })
                .collect(),
        }]
    }

    fn target(machine: u16, endian: RunTimeEndian) -> Target {
        Target {
            machine,
            flags: 0,
            endian,
        }
    }

    const SYMBOLS: &[u64] = &[0, 0x1000, 0x100, 0x180];

    #[test]
    fn abs32_little_endian() {
        let mut sections = vec![section(vec![0xaa; 8])];
        let count = apply_relocations(
            &target(elf::EM_X86_64, RunTimeEndian::Little),
            &mut sections,
            &relocs(vec![(2, 1, 10, Some(4))]),
            Some(SYMBOLS),
        );
        assert_eq!(count, 1);
        assert_eq!(sections[0].data, [0xaa, 0xaa, 0x04, 0x10, 0, 0, 0xaa, 0xaa]);
    }

    #[test]
    fn abs32_big_endian() {
        let mut sections = vec![section(vec![0; 4])];
        let count = apply_relocations(
            &target(elf::EM_PPC, RunTimeEndian::Big),
            &mut sections,
            &relocs(vec![(0, 1, 1, Some(4))]),
            Some(SYMBOLS),
        );
        assert_eq!(count, 1);
        assert_eq!(sections[0].data, [0, 0, 0x10, 0x04]);
    }

    #[test]
    fn implicit_addend() {
        let mut sections = vec![section(vec![4, 0, 0, 0, 0xf8, 0xff, 0xff, 0xff])];
        let count = apply_relocations(
            &target(elf::EM_386, RunTimeEndian::Little),
            &mut sections,
            &relocs(vec![(0, 1, 1, None), (4, 1, 2, None)]),
            Some(SYMBOLS),
        );
        assert_eq!(count, 2);
        // S + A, then S + A - P with A = -8 and P = 4.
        assert_eq!(sections[0].data, [0x04, 0x10, 0, 0, 0xf4, 0x0f, 0, 0]);
    }

    #[test]
    fn in_place_arithmetic() {
        let mut sections = vec![section(vec![0x10, 0, 0, 0, 0x00, 0x00, 0xc5])];
        let count = apply_relocations(
            &target(elf::EM_RISCV, RunTimeEndian::Little),
            &mut sections,
            &relocs(vec![
                (0, 3, 35, Some(0)), // ADD32
                (0, 2, 39, Some(0)), // SUB32
                (4, 2, 33, Some(1)), // ADD8, truncated
                (6, 2, 53, Some(2)), // SET6
            ]),
            Some(SYMBOLS),
        );
        assert_eq!(count, 4);
        assert_eq!(sections[0].data, [0x90, 0, 0, 0, 0x01, 0x00, 0xc2]);
    }

    #[test]
    fn msp430_sym_diff() {
        let mut sections = vec![section(vec![0; 6])];
        let count = apply_relocations(
            &target(elf::EM_MSP430, RunTimeEndian::Little),
            &mut sections,
            &relocs(vec![
                (0, 2, 10, Some(0)), // SYM_DIFF
                (0, 3, 1, Some(2)),  // R_MSP430_32
                (4, 2, 5, Some(1)),  // R_MSP430_16_BYTE, no SYM_DIFF
            ]),
            Some(SYMBOLS),
        );
        assert_eq!(count, 2);
        assert_eq!(sections[0].data, [0x82, 0, 0, 0, 0x01, 0x01]);
    }

    #[test]
    fn msp430x_sym_diff() {
        let mut sections = vec![section(vec![0; 2])];
        let target = Target {
            machine: elf::EM_MSP430,
            flags: 45,
            endian: RunTimeEndian::Little,
        };
        let count = apply_relocations(
            &target,
            &mut sections,
            &relocs(vec![(0, 2, 21, Some(0)), (0, 3, 2, Some(0))]),
            Some(SYMBOLS),
        );
        assert_eq!(count, 1);
        assert_eq!(sections[0].data, [0x80, 0]);
    }

    #[test]
    fn msp430x_sym_diff_survives_unrelated_type() {
        let mut sections = vec![section(vec![0; 4])];
        let target = Target {
            machine: elf::EM_MSP430,
            flags: 45,
            endian: RunTimeEndian::Little,
        };
        let count = apply_relocations(
            &target,
            &mut sections,
            &relocs(vec![
                (0, 2, 21, Some(0)), // SYM_DIFF
                (2, 1, 10, Some(0)), // not a SYM_DIFF type on MSP430X
                (0, 3, 15, Some(0)), // R_MSP430X_ABS16
            ]),
            Some(SYMBOLS),
        );
        assert_eq!(count, 1);
        assert_eq!(sections[0].data, [0x80, 0, 0, 0]);
    }

    #[test]
    fn sequence_resets_per_section() {
        let mut sections = vec![
            section(vec![0; 4]),
            DebugSection {
                index: 4,
                name: ".debug_line".into(),
                data: vec![0; 4],
            },
        ];
        let mut list = relocs(vec![(0, 2, 10, Some(0))]);
        list.push(RelocationSection {
            target: 4,
            relocations: vec![Relocation {
                offset: 0,
                symbol: 3,
                r_type: 1,
                addend: Some(0),
            }],
        });
        let count = apply_relocations(
            &target(elf::EM_MSP430, RunTimeEndian::Little),
            &mut sections,
            &list,
            Some(SYMBOLS),
        );
        assert_eq!(count, 1);
        assert_eq!(sections[1].data, [0x80, 0x01, 0, 0]);
    }

    #[test]
    fn rl78_stack() {
        let mut sections = vec![section(vec![0; 4])];
        let count = apply_relocations(
            &target(elf::EM_RL78, RunTimeEndian::Little),
            &mut sections,
            &relocs(vec![
                (0, 3, 0x80, Some(0)),
                (0, 2, 0x80, Some(0)),
                (0, 0, 0x83, Some(0)),
                (0, 0, 0x41, Some(0)),
            ]),
            Some(SYMBOLS),
        );
        assert_eq!(count, 1);
        assert_eq!(sections[0].data, [0x80, 0, 0, 0]);
    }

    #[test]
    fn mn10300_sym_diff() {
        let mut sections = vec![section(vec![0; 2])];
        let count = apply_relocations(
            &target(elf::EM_MN10300, RunTimeEndian::Little),
            &mut sections,
            &relocs(vec![(0, 0, 34, Some(0)), (0, 2, 33, Some(0)), (0, 3, 2, Some(0))]),
            Some(SYMBOLS),
        );
        assert_eq!(count, 1);
        assert_eq!(sections[0].data, [0x80, 0]);
    }

    #[test]
    fn bad_relocations_are_skipped() {
        let mut sections = vec![section(vec![0; 4])];
        let endian = RunTimeEndian::Little;
        let list = relocs(vec![
            (2, 1, 10, Some(0)),     // offset out of range
            (0, 99, 10, Some(0)),    // symbol out of range
            (0, 1, 9999, Some(0)),   // unknown type
            (0, 1, 9999, Some(0)),
            (u64::MAX, 1, 10, Some(0)),
            (0, 1, 10, Some(0)),
        ]);
        let count = apply_relocations(
            &target(elf::EM_X86_64, endian),
            &mut sections,
            &list,
            Some(SYMBOLS),
        );
        assert_eq!(count, 1);
        assert_eq!(sections[0].data, [0, 0x10, 0, 0]);

        let mut sections = vec![section(vec![0; 4])];
        let count =
            apply_relocations(&target(elf::EM_X86_64, endian), &mut sections, &list, None);
        assert_eq!(count, 0);
        assert_eq!(sections[0].data, [0; 4]);
    }
}
