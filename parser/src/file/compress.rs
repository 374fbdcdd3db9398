//! Compressed debug sections.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::ZlibDecoder;

const ELFCOMPRESS_ZLIB: u32 = 1;

/// How a section's bytes are wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    /// `SHF_COMPRESSED`, with an `Elf32_Chdr` or `Elf64_Chdr` header.
    Elf { is_64: bool },
    /// A `.zdebug_*` section: `ZLIB` and a big-endian 64 bit size.
    Legacy,
}

/// Return the uncompressed bytes of a section.
///
/// Returns `None` if the header is not recognized or the data does not
/// inflate to the recorded size. Callers treat the section as absent.
pub fn decompress(
    data: &[u8],
    compression: Compression,
    endian: gimli::RunTimeEndian,
) -> Option<Cow<[u8]>> {
    let (size, payload) = match compression {
        Compression::None => return Some(Cow::Borrowed(data)),
        Compression::Elf { is_64 } => {
            let (ch_type, size, header_size) = if is_64 {
                let ch_type = read_u32(data.get(0..4)?, endian);
                let size = read_u64(data.get(8..16)?, endian);
                (ch_type, size, 24)
            } else {
                let ch_type = read_u32(data.get(0..4)?, endian);
                let size = u64::from(read_u32(data.get(4..8)?, endian));
                (ch_type, size, 12)
            };
            if ch_type != ELFCOMPRESS_ZLIB {
                warn!("unsupported section compression type {}", ch_type);
                return None;
            }
            (size, data.get(header_size..)?)
        }
        Compression::Legacy => {
            if data.get(0..4)? != b"ZLIB" {
                warn!("missing ZLIB signature in compressed section");
                return None;
            }
            let size = read_u64(data.get(4..12)?, gimli::RunTimeEndian::Big);
            (size, data.get(12..)?)
        }
    };

    // The recorded size is untrusted, so only use it as a hint.
    let capacity = size.min(payload.len() as u64 * 32) as usize;
    let mut out = Vec::with_capacity(capacity);
    if let Err(e) = ZlibDecoder::new(payload).read_to_end(&mut out) {
        warn!("section decompression failed: {}", e);
        return None;
    }
    if out.len() as u64 != size {
        warn!(
            "decompressed section size {} does not match header size {}",
            out.len(),
            size
        );
        return None;
    }
    Some(Cow::Owned(out))
}

fn read_u32(bytes: &[u8], endian: gimli::RunTimeEndian) -> u32 {
    let mut buf = [0; 4];
    buf.copy_from_slice(bytes);
    match endian {
        gimli::RunTimeEndian::Little => u32::from_le_bytes(buf),
        gimli::RunTimeEndian::Big => u32::from_be_bytes(buf),
    }
}

fn read_u64(bytes: &[u8], endian: gimli::RunTimeEndian) -> u64 {
    let mut buf = [0; 8];
    buf.copy_from_slice(bytes);
    match endian {
        gimli::RunTimeEndian::Little => u64::from_le_bytes(buf),
        gimli::RunTimeEndian::Big => u64::from_be_bytes(buf),
    }
}
