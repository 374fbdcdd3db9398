//! Location expressions and location lists.

use gimli::Reader as _;

use super::Reader;
use crate::location::{Location, LocationRange, Register};

/// The result of decoding a location expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expression {
    /// The expression was a single `DW_OP_addr`.
    Address(u64),
    Locations(Vec<Location>),
}

/// Decode the supported operations of an expression.
///
/// Decoding stops at the first unsupported operation; the operations
/// before it are still returned.
pub(crate) fn decode(mut r: Reader, address_size: u8) -> Expression {
    let mut locations = Vec::new();
    let mut first = true;
    while !r.is_empty() {
        match operation(&mut r, address_size) {
            Ok(Some(Location::Address { address })) if first && r.is_empty() => {
                return Expression::Address(address);
            }
            Ok(Some(location)) => locations.push(location),
            Ok(None) => break,
            Err(e) => {
                debug!("truncated location expression: {}", e);
                break;
            }
        }
        first = false;
    }
    Expression::Locations(locations)
}

fn operation(r: &mut Reader, address_size: u8) -> gimli::Result<Option<Location>> {
    let op = gimli::DwOp(r.read_u8()?);
    let location = match op {
        gimli::DW_OP_addr => Location::Address {
            address: r.read_address(address_size)?,
        },
        gimli::DW_OP_deref => Location::Deref,
        gimli::DW_OP_const1u => constant(r.read_u8()?.into()),
        gimli::DW_OP_const1s => constant(r.read_i8()? as u64),
        gimli::DW_OP_const2u => constant(r.read_u16()?.into()),
        gimli::DW_OP_const2s => constant(r.read_i16()? as u64),
        gimli::DW_OP_const4u => constant(r.read_u32()?.into()),
        gimli::DW_OP_const4s => constant(r.read_i32()? as u64),
        gimli::DW_OP_const8u => constant(r.read_u64()?),
        gimli::DW_OP_const8s => constant(r.read_i64()? as u64),
        gimli::DW_OP_constu => constant(r.read_uleb128()?),
        gimli::DW_OP_consts => constant(r.read_sleb128()? as u64),
        gimli::DW_OP_plus_uconst => Location::PlusConstant {
            value: r.read_uleb128()?,
        },
        gimli::DW_OP_regx => Location::Register {
            register: Register(r.read_uleb128_u16()?),
        },
        gimli::DW_OP_fbreg => Location::FrameOffset {
            offset: r.read_sleb128()?,
        },
        gimli::DW_OP_bregx => {
            let register = Register(r.read_uleb128_u16()?);
            let offset = r.read_sleb128()?;
            Location::RegisterOffset { register, offset }
        }
        gimli::DW_OP_call_frame_cfa => Location::Cfa,
        gimli::DW_OP_form_tls_address | gimli::DW_OP_GNU_push_tls_address => Location::Tls,
        _ if op.0 >= gimli::DW_OP_lit0.0 && op.0 <= gimli::DW_OP_lit31.0 => {
            constant(u64::from(op.0 - gimli::DW_OP_lit0.0))
        }
        _ if op.0 >= gimli::DW_OP_reg0.0 && op.0 <= gimli::DW_OP_reg31.0 => Location::Register {
            register: Register(u16::from(op.0 - gimli::DW_OP_reg0.0)),
        },
        _ if op.0 >= gimli::DW_OP_breg0.0 && op.0 <= gimli::DW_OP_breg31.0 => {
            Location::RegisterOffset {
                register: Register(u16::from(op.0 - gimli::DW_OP_breg0.0)),
                offset: r.read_sleb128()?,
            }
        }
        _ => {
            debug!("unsupported location operation {}", op);
            return Ok(None);
        }
    };
    Ok(Some(location))
}

#[inline]
fn constant(value: u64) -> Location {
    Location::Constant { value }
}

/// Read a DWARF 4 style location list from `.debug_loc`.
///
/// Addresses are relative to `base`, which is updated by base address
/// selection entries.
pub(crate) fn location_list(
    debug_loc: Reader,
    offset: usize,
    address_size: u8,
    base: u64,
) -> gimli::Result<Vec<LocationRange>> {
    if offset >= debug_loc.len() {
        return Err(gimli::Error::UnexpectedEof(debug_loc.offset_id()));
    }
    let mut r = debug_loc.range_from(offset..);
    let max = if address_size >= 8 {
        !0u64
    } else {
        (1u64 << (8 * u64::from(address_size))) - 1
    };
    let mut base = base;
    let mut ranges = Vec::new();
    loop {
        let begin = r.read_address(address_size)?;
        let end = r.read_address(address_size)?;
        if begin == 0 && end == 0 {
            break;
        }
        if begin == max {
            base = end;
            continue;
        }
        let len = r.read_u16()?;
        let expression = r.split(usize::from(len))?;
        let locations = match decode(expression, address_size) {
            Expression::Address(address) => vec![Location::Address { address }],
            Expression::Locations(locations) => locations,
        };
        ranges.push(LocationRange {
            begin: base.wrapping_add(begin),
            end: base.wrapping_add(end),
            locations,
        });
    }
    Ok(ranges)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::file::dwarf::test::{sleb, uleb};
    use gimli::{EndianSlice, RunTimeEndian};

    fn expr(bytes: &[u8]) -> Expression {
        decode(EndianSlice::new(bytes, RunTimeEndian::Little), 8)
    }

    #[test]
    fn single_address() {
        let mut buf = vec![gimli::DW_OP_addr.0];
        buf.extend(&0x1234_5678u64.to_le_bytes());
        assert_eq!(expr(&buf), Expression::Address(0x1234_5678));

        buf.push(gimli::DW_OP_GNU_push_tls_address.0);
        assert_eq!(
            expr(&buf),
            Expression::Locations(vec![Location::Address { address: 0x1234_5678 }, Location::Tls])
        );
    }

    #[test]
    fn operations() {
        let mut buf = vec![gimli::DW_OP_fbreg.0];
        buf.extend(sleb(-24));
        buf.push(gimli::DW_OP_breg7.0);
        buf.extend(sleb(8));
        buf.push(gimli::DW_OP_reg3.0);
        buf.push(gimli::DW_OP_regx.0);
        buf.extend(uleb(40));
        buf.push(gimli::DW_OP_deref.0);
        buf.push(gimli::DW_OP_plus_uconst.0);
        buf.extend(uleb(16));
        buf.push(gimli::DW_OP_lit5.0);
        buf.push(gimli::DW_OP_call_frame_cfa.0);
        assert_eq!(
            expr(&buf),
            Expression::Locations(vec![
                Location::FrameOffset { offset: -24 },
                Location::RegisterOffset {
                    register: Register(7),
                    offset: 8
                },
                Location::Register {
                    register: Register(3)
                },
                Location::Register {
                    register: Register(40)
                },
                Location::Deref,
                Location::PlusConstant { value: 16 },
                Location::Constant { value: 5 },
                Location::Cfa,
            ])
        );
    }

    #[test]
    fn unsupported_stops() {
        let buf = [
            gimli::DW_OP_reg0.0,
            gimli::DW_OP_piece.0,
            4,
            gimli::DW_OP_reg1.0,
        ];
        assert_eq!(
            expr(&buf),
            Expression::Locations(vec![Location::Register {
                register: Register(0)
            }])
        );
    }

    #[test]
    fn loc_list() {
        let mut buf = vec![0xee];
        // Base address selection.
        buf.extend(&[0xff; 4]);
        buf.extend(&0x1000u32.to_le_bytes());
        buf.extend(&0x10u32.to_le_bytes());
        buf.extend(&0x20u32.to_le_bytes());
        buf.extend(&1u16.to_le_bytes());
        buf.push(gimli::DW_OP_reg5.0);
        buf.extend(&[0; 8]);
        let r = EndianSlice::new(&buf, RunTimeEndian::Little);
        let list = location_list(r, 1, 4, 0).unwrap();
        assert_eq!(
            list,
            vec![LocationRange {
                begin: 0x1010,
                end: 0x1020,
                locations: vec![Location::Register {
                    register: Register(5)
                }],
            }]
        );
        assert!(location_list(r, buf.len(), 4, 0).is_err());
    }
}
