/// A register number.
///
/// The mapping to a register name depends on the target machine and is
/// left to the renderer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(pub u16);

/// One step of a decoded location expression.
///
/// A variable's location is an ordered list of these, evaluated in order
/// the way the DWARF expression would be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The value is stored in a register.
    Register {
        /// The register number.
        register: Register,
    },
    /// The value is stored in memory at an offset from an address stored in a register.
    RegisterOffset {
        /// The register number.
        register: Register,
        /// The offset.
        offset: i64,
    },
    /// The value is stored in memory at an offset from the frame base.
    FrameOffset {
        /// The offset.
        offset: i64,
    },
    /// Push the canonical frame address.
    Cfa,
    /// Dereference the address on top of the stack.
    Deref,
    /// Add a constant to the top of the stack.
    PlusConstant {
        /// The addend.
        value: u64,
    },
    /// Push a constant.
    Constant {
        /// The constant.
        value: u64,
    },
    /// Push an address. This address may need relocation.
    Address {
        /// The address.
        address: u64,
    },
    /// Convert the top of the stack from a TLS offset to an address.
    Tls,
}

/// A location that is only valid within an address range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRange {
    /// The first address of the range.
    pub begin: u64,
    /// One past the last address of the range.
    pub end: u64,
    /// The location within the range.
    pub locations: Vec<Location>,
}

/// Return the member offset described by a location expression.
///
/// Producers describe a constant member offset as `DW_OP_plus_uconst N`,
/// optionally preceded by `DW_OP_constu 0`.
pub(crate) fn member_offset(locations: &[Location]) -> Option<u64> {
    match locations {
        [Location::PlusConstant { value }] => Some(*value),
        [Location::Constant { value }] => Some(*value),
        [Location::Constant { value: base }, Location::PlusConstant { value }] => {
            Some(base.wrapping_add(*value))
        }
        _ => None,
    }
}
