//! Decode DWARF debugging information into per-unit symbol trees.
//!
//! The entry points are [`File::parse`] for ELF files on disk and
//! [`parse_sections`] for section bytes that are already in memory.
//! Each finished compilation unit is handed to a [`Sink`].

// Enable some rust 2018 idioms.
#![warn(bare_trait_objects)]
#![warn(unused_extern_crates)]
// Calm down clippy.
#![allow(clippy::single_match)]
#![allow(clippy::too_many_arguments)]

#[macro_use]
extern crate log;

mod builder;
mod dedup;
mod element;
mod file;
mod location;
mod options;
mod unit;

pub use crate::dedup::DedupTable;
pub use crate::element::*;
pub use crate::file::compress::{decompress, Compression};
pub use crate::file::reloc::{
    apply_relocations, DebugSection, Relocation, RelocationSection, Target,
};
pub use crate::file::reloc_table::{classify, RelocationClass};
pub use crate::file::{parse_sections, DebugSections, File, ParseStats};
pub use crate::location::*;
pub use crate::options::Options;
pub use crate::unit::*;

use std::borrow::{Borrow, Cow};
use std::error;
use std::fmt;
use std::io;
use std::result;

#[derive(Debug)]
pub struct Error(pub Cow<'static, str>);

impl error::Error for Error {
    fn description(&self) -> &str {
        self.0.borrow()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&'static str> for Error {
    fn from(s: &'static str) -> Error {
        Error(Cow::Borrowed(s))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error(Cow::Owned(s))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error(Cow::Owned(format!("IO error: {}", e)))
    }
}

impl From<gimli::Error> for Error {
    fn from(e: gimli::Error) -> Error {
        Error(Cow::Owned(format!("DWARF error: {}", e)))
    }
}

impl From<object::read::Error> for Error {
    fn from(e: object::read::Error) -> Error {
        Error(Cow::Owned(format!("object error: {}", e)))
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Receives each compilation unit once its tree is complete.
///
/// Renderers implement this. The tree is handed over by value; the dedup
/// table is shared state that persists across units.
pub trait Sink<'input> {
    /// Called once per successfully decoded compilation unit, in file order.
    fn unit_complete(&mut self, tree: UnitTree<'input>, dedup: &DedupTable<'input>) -> Result<()>;
}
