//! Relocation types that can appear in the debug sections of object files.

use object::elf;

/// How a relocation modifies the bytes it targets.
///
/// Widths are in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationClass {
    /// No effect.
    None,
    /// `S + A`.
    Abs(u8),
    /// `S + A - P`, where `P` is the offset of the patched bytes.
    PcRel(u8),
    /// In place: existing value plus `S + A`.
    Add(u8),
    /// In place: existing value minus `S + A`.
    Sub(u8),
    /// Low six bits set to `S + A`.
    Set6,
    /// Low six bits of the existing value plus `S + A`.
    Add6,
    /// Low six bits of the existing value minus `S + A`.
    Sub6,
}

// Machine numbers used before official assignment.
const EM_ALPHA_OLD: u16 = 0x9026;
const EM_AVR_OLD: u16 = 0x1057;
const EM_MSP430_OLD: u16 = 0x1059;
const EM_CYGNUS_FR30: u16 = 0x3330;
const EM_CYGNUS_M32R: u16 = 0x9041;
const EM_CYGNUS_V850: u16 = 0x9080;
const EM_CYGNUS_MN10300: u16 = 0xbeef;
const EM_S390_OLD: u16 = 0xa390;

const EF_MSP430_MACH: u32 = 0xff;
const E_MSP430_MACH_MSP430X: u32 = 45;

/// Whether an MSP430 file uses the MSP430X relocation numbering.
pub(crate) fn is_msp430x(machine: u16, flags: u32) -> bool {
    machine == elf::EM_MSP430 && flags & EF_MSP430_MACH == E_MSP430_MACH_MSP430X
}

use self::RelocationClass::*;

struct Types {
    machines: &'static [u16],
    types: &'static [(u32, RelocationClass)],
}

static TABLE: &[Types] = &[
    Types {
        machines: &[elf::EM_X86_64],
        types: &[
            (1, Abs(8)),   // R_X86_64_64
            (2, PcRel(4)), // R_X86_64_PC32
            (10, Abs(4)),  // R_X86_64_32
            (11, Abs(4)),  // R_X86_64_32S
            (12, Abs(2)),  // R_X86_64_16
            (13, PcRel(2)),
            (14, Abs(1)),
            (15, PcRel(1)),
            (17, Abs(8)), // R_X86_64_DTPOFF64
            (21, Abs(4)), // R_X86_64_DTPOFF32
            (24, PcRel(8)),
            (32, Abs(4)), // R_X86_64_SIZE32
            (33, Abs(8)),
        ],
    },
    Types {
        machines: &[elf::EM_386, elf::EM_IAMCU],
        types: &[
            (1, Abs(4)), // R_386_32
            (2, PcRel(4)),
            (20, Abs(2)),
            (21, PcRel(2)),
            (22, Abs(1)),
            (23, PcRel(1)),
            (32, Abs(4)), // R_386_TLS_LDO_32
        ],
    },
    Types {
        machines: &[elf::EM_AARCH64],
        types: &[
            (256, None),
            (257, Abs(8)), // R_AARCH64_ABS64
            (258, Abs(4)),
            (259, Abs(2)),
            (260, PcRel(8)),
            (261, PcRel(4)),
            (262, PcRel(2)),
            (1029, Abs(8)), // R_AARCH64_TLS_DTPREL64
        ],
    },
    Types {
        machines: &[elf::EM_ARM],
        types: &[
            (2, Abs(4)),   // R_ARM_ABS32
            (3, PcRel(4)), // R_ARM_REL32
            (5, Abs(2)),
            (8, Abs(1)),
            (106, Abs(4)), // R_ARM_TLS_LDO32
        ],
    },
    Types {
        machines: &[elf::EM_RISCV],
        types: &[
            (1, Abs(4)), // R_RISCV_32
            (2, Abs(8)),
            (33, Add(1)), // R_RISCV_ADD8
            (34, Add(2)),
            (35, Add(4)),
            (36, Add(8)),
            (37, Sub(1)), // R_RISCV_SUB8
            (38, Sub(2)),
            (39, Sub(4)),
            (40, Sub(8)),
            (43, None), // R_RISCV_ALIGN
            (51, None), // R_RISCV_RELAX
            (52, Sub6),
            (53, Set6),
            (54, Abs(1)), // R_RISCV_SET8
            (55, Abs(2)),
            (56, Abs(4)),
            (57, PcRel(4)), // R_RISCV_32_PCREL
        ],
    },
    Types {
        machines: &[elf::EM_LOONGARCH],
        types: &[
            (1, Abs(4)), // R_LARCH_32
            (2, Abs(8)),
            (47, Add(1)), // R_LARCH_ADD8
            (48, Add(2)),
            (49, Add(3)),
            (50, Add(4)),
            (51, Add(8)),
            (52, Sub(1)), // R_LARCH_SUB8
            (53, Sub(2)),
            (54, Sub(3)),
            (55, Sub(4)),
            (56, Sub(8)),
            (99, PcRel(4)), // R_LARCH_32_PCREL
            (100, None),    // R_LARCH_RELAX
            (102, None),    // R_LARCH_ALIGN
            (105, Add6),
            (106, Sub6),
            (109, PcRel(8)),
        ],
    },
    Types {
        machines: &[elf::EM_PPC],
        types: &[
            (1, Abs(4)), // R_PPC_ADDR32
            (3, Abs(2)),
            (24, Abs(4)), // R_PPC_UADDR32
            (25, Abs(2)),
            (26, PcRel(4)), // R_PPC_REL32
            (78, Abs(4)),   // R_PPC_DTPREL32
        ],
    },
    Types {
        machines: &[elf::EM_PPC64],
        types: &[
            (1, Abs(4)), // R_PPC64_ADDR32
            (3, Abs(2)),
            (24, Abs(4)),
            (26, PcRel(4)),
            (38, Abs(8)), // R_PPC64_ADDR64
            (43, Abs(8)), // R_PPC64_UADDR64
            (44, PcRel(8)),
            (78, Abs(8)), // R_PPC64_DTPREL64
        ],
    },
    Types {
        machines: &[elf::EM_S390, EM_S390_OLD],
        types: &[
            (1, Abs(1)), // R_390_8
            (3, Abs(2)),
            (4, Abs(4)), // R_390_32
            (5, PcRel(4)),
            (22, Abs(8)), // R_390_64
            (23, PcRel(8)),
            (52, Abs(4)), // R_390_TLS_LDO32
            (53, Abs(8)),
        ],
    },
    Types {
        machines: &[elf::EM_SPARC, elf::EM_SPARC32PLUS, elf::EM_SPARCV9],
        types: &[
            (1, Abs(1)), // R_SPARC_8
            (2, Abs(2)),
            (3, Abs(4)), // R_SPARC_32
            (6, PcRel(4)),
            (23, Abs(4)), // R_SPARC_UA32
            (32, Abs(8)), // R_SPARC_64
            (46, PcRel(8)),
            (54, Abs(8)), // R_SPARC_UA64
            (55, Abs(2)),
            (76, Abs(4)), // R_SPARC_TLS_DTPOFF32
            (77, Abs(8)),
        ],
    },
    Types {
        machines: &[elf::EM_MIPS, elf::EM_MIPS_RS3_LE],
        types: &[
            (1, Abs(2)), // R_MIPS_16
            (2, Abs(4)), // R_MIPS_32
            (18, Abs(8)),
            (39, Abs(4)), // R_MIPS_TLS_DTPREL32
            (41, Abs(8)),
            (248, PcRel(4)), // R_MIPS_PC32
        ],
    },
    Types {
        machines: &[elf::EM_PARISC],
        types: &[
            (1, Abs(4)), // R_PARISC_DIR32
            (9, PcRel(4)),
            (41, Abs(4)), // R_PARISC_SECREL32
            (70, Abs(4)), // R_PARISC_SEGREL32
            (80, Abs(8)), // R_PARISC_DIR64
        ],
    },
    Types {
        machines: &[elf::EM_IA_64],
        types: &[
            (0x24, Abs(4)), // R_IA64_DIR32MSB
            (0x25, Abs(4)),
            (0x26, Abs(8)),
            (0x27, Abs(8)),
            (0x64, Abs(4)), // R_IA64_SECREL32MSB
            (0x65, Abs(4)),
            (0x66, Abs(8)),
            (0x67, Abs(8)),
        ],
    },
    Types {
        machines: &[elf::EM_SH],
        types: &[
            (1, Abs(4)), // R_SH_DIR32
            (2, PcRel(4)),
        ],
    },
    Types {
        machines: &[elf::EM_68K],
        types: &[
            (1, Abs(4)), // R_68K_32
            (2, Abs(2)),
            (3, Abs(1)),
            (4, PcRel(4)),
        ],
    },
    Types {
        machines: &[elf::EM_ALPHA, EM_ALPHA_OLD],
        types: &[
            (1, Abs(4)), // R_ALPHA_REFLONG
            (2, Abs(8)),
            (10, PcRel(4)), // R_ALPHA_SREL32
            (11, PcRel(8)),
        ],
    },
    Types {
        machines: &[elf::EM_AVR, EM_AVR_OLD],
        types: &[
            (1, Abs(4)), // R_AVR_32
            (4, Abs(2)),
            (30, Sub(1)), // R_AVR_DIFF8
            (31, Sub(2)),
            (32, Sub(4)),
        ],
    },
    Types {
        machines: &[elf::EM_MN10300, EM_CYGNUS_MN10300],
        types: &[
            (1, Abs(4)), // R_MN10300_32
            (2, Abs(2)),
            (3, Abs(1)),
            (4, PcRel(4)),
            (34, None), // R_MN10300_ALIGN
        ],
    },
    Types {
        machines: &[elf::EM_RL78],
        types: &[(1, Abs(4))], // R_RL78_DIR32
    },
    Types {
        machines: &[elf::EM_TI_C6000],
        types: &[
            (1, Abs(4)), // R_C6000_ABS32
            (2, Abs(2)),
            (3, Abs(1)),
        ],
    },
    Types {
        machines: &[elf::EM_XTENSA],
        types: &[
            (1, Abs(4)), // R_XTENSA_32
            (14, PcRel(4)),
        ],
    },
    Types {
        machines: &[elf::EM_MICROBLAZE],
        types: &[
            (1, Abs(4)), // R_MICROBLAZE_32
            (2, PcRel(4)),
        ],
    },
    Types {
        machines: &[elf::EM_ALTERA_NIOS2],
        types: &[
            (12, Abs(4)), // R_NIOS2_BFD_RELOC32
            (13, Abs(2)),
        ],
    },
    Types {
        machines: &[elf::EM_OPENRISC],
        types: &[
            (1, Abs(4)), // R_OR1K_32
            (2, Abs(2)),
            (3, Abs(1)),
            (9, PcRel(4)),
        ],
    },
    Types {
        machines: &[elf::EM_BPF],
        types: &[
            (2, Abs(8)), // R_BPF_64_ABS64
            (3, Abs(4)),
            (4, Abs(4)), // R_BPF_64_NODYLD32
        ],
    },
    Types {
        machines: &[elf::EM_CRIS],
        types: &[
            (1, Abs(1)), // R_CRIS_8
            (2, Abs(2)),
            (3, Abs(4)),
            (6, PcRel(4)),
        ],
    },
    Types {
        machines: &[elf::EM_M32R, EM_CYGNUS_M32R],
        types: &[
            (3, Abs(4)),  // R_M32R_32
            (34, Abs(4)), // R_M32R_32_RELA
        ],
    },
    Types {
        machines: &[elf::EM_V850, EM_CYGNUS_V850],
        types: &[(6, Abs(4))], // R_V850_ABS32
    },
    Types {
        machines: &[elf::EM_ARC_COMPACT, elf::EM_ARC_COMPACT2],
        types: &[(4, Abs(4))], // R_ARC_32
    },
    Types {
        machines: &[elf::EM_H8_300, elf::EM_H8_300H],
        types: &[(1, Abs(4))], // R_H8_DIR32
    },
    Types {
        machines: &[elf::EM_FR30, EM_CYGNUS_FR30],
        types: &[(3, Abs(4))], // R_FR30_32
    },
    Types {
        machines: &[elf::EM_TILEGX],
        types: &[
            (1, Abs(8)), // R_TILEGX_64
            (2, Abs(4)),
        ],
    },
    Types {
        machines: &[elf::EM_CSKY],
        types: &[(1, Abs(4))], // R_CKCORE_ADDR32
    },
];

static MSP430: &[(u32, RelocationClass)] = &[
    (1, Abs(4)), // R_MSP430_32
    (3, Abs(2)), // R_MSP430_16
    (5, Abs(2)), // R_MSP430_16_BYTE
    (9, Abs(1)), // R_MSP430_8
];

static MSP430X: &[(u32, RelocationClass)] = &[
    (1, Abs(4)),  // R_MSP430_ABS32
    (2, Abs(2)),  // R_MSP430_ABS16
    (3, Abs(1)),  // R_MSP430_ABS8
    (15, Abs(2)), // R_MSP430X_ABS16
];

/// Look up one relocation type for an ELF machine.
///
/// Returns `None` for types that are not expected in debug sections.
pub fn classify(machine: u16, flags: u32, r_type: u32) -> Option<RelocationClass> {
    if r_type == 0 {
        return Some(RelocationClass::None);
    }
    let types = match machine {
        elf::EM_MSP430 | EM_MSP430_OLD => {
            if is_msp430x(machine, flags) {
                MSP430X
            } else {
                MSP430
            }
        }
        _ => {
            TABLE
                .iter()
                .find(|entry| entry.machines.contains(&machine))?
                .types
        }
    };
    types
        .iter()
        .find(|(t, _)| *t == r_type)
        .map(|(_, class)| *class)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn common_machines() {
        assert_eq!(classify(elf::EM_X86_64, 0, 10), Some(Abs(4)));
        assert_eq!(classify(elf::EM_X86_64, 0, 1), Some(Abs(8)));
        assert_eq!(classify(elf::EM_X86_64, 0, 2), Some(PcRel(4)));
        assert_eq!(classify(elf::EM_X86_64, 0, 0), Some(None));
        assert_eq!(classify(elf::EM_X86_64, 0, 9999), Option::None);
        assert_eq!(classify(elf::EM_AARCH64, 0, 257), Some(Abs(8)));
        assert_eq!(classify(elf::EM_AARCH64, 0, 256), Some(None));
        assert_eq!(classify(elf::EM_PPC, 0, 1), Some(Abs(4)));
        assert_eq!(classify(elf::EM_SPARCV9, 0, 54), Some(Abs(8)));
        assert_eq!(classify(EM_CYGNUS_MN10300, 0, 1), Some(Abs(4)));
        assert_eq!(classify(0xfff0, 0, 1), Option::None);
    }

    #[test]
    fn in_place_arithmetic() {
        assert_eq!(classify(elf::EM_RISCV, 0, 35), Some(Add(4)));
        assert_eq!(classify(elf::EM_RISCV, 0, 39), Some(Sub(4)));
        assert_eq!(classify(elf::EM_RISCV, 0, 52), Some(Sub6));
        assert_eq!(classify(elf::EM_RISCV, 0, 53), Some(Set6));
        assert_eq!(classify(elf::EM_RISCV, 0, 51), Some(None));
        assert_eq!(classify(elf::EM_LOONGARCH, 0, 49), Some(Add(3)));
        assert_eq!(classify(elf::EM_LOONGARCH, 0, 105), Some(Add6));
    }

    #[test]
    fn msp430_numbering() {
        assert!(is_msp430x(elf::EM_MSP430, 45));
        assert!(!is_msp430x(elf::EM_MSP430, 14));
        assert!(!is_msp430x(EM_MSP430_OLD, 45));
        assert_eq!(classify(elf::EM_MSP430, 14, 5), Some(Abs(2)));
        assert_eq!(classify(elf::EM_MSP430, 14, 2), Option::None);
        assert_eq!(classify(elf::EM_MSP430, 45, 2), Some(Abs(2)));
        assert_eq!(classify(elf::EM_MSP430, 45, 5), Option::None);
        assert_eq!(classify(EM_MSP430_OLD, 0, 1), Some(Abs(4)));
    }
}
