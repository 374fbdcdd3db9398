//! Render the symbol trees decoded by `dwtree_parser`.

// Enable some rust 2018 idioms.
#![warn(bare_trait_objects)]
#![warn(unused_extern_crates)]
// Calm down clippy.
#![allow(clippy::single_match)]

#[macro_use]
extern crate log;

use std::io::Write;
use std::path::Path;

pub use parser::{DebugSections, Error, File, Options, ParseStats, Result};

mod print;
pub use self::print::{OutlinePrinter, TextPrinter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Pseudo-C declarations.
    Text,
    /// One line per element.
    Outline,
}

impl Default for Format {
    fn default() -> Self {
        Format::Text
    }
}

#[derive(Debug, Clone)]
pub struct PrintOptions {
    pub format: Format,
    /// Print a one-line reference for definitions replaced by an earlier one.
    pub print_replaced: bool,
    pub print_address: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        PrintOptions {
            format: Format::Text,
            print_replaced: true,
            print_address: false,
        }
    }
}

/// Decode the file at `path` and print every unit to `w`.
pub fn print_file<P: AsRef<Path>>(
    path: P,
    options: &Options,
    print: &PrintOptions,
    w: &mut dyn Write,
) -> Result<ParseStats> {
    match print.format {
        Format::Text => {
            let mut printer = TextPrinter::new(w, print);
            File::parse(path, options, &mut printer)
        }
        Format::Outline => {
            let mut printer = OutlinePrinter::new(w, print);
            File::parse(path, options, &mut printer)
        }
    }
}

/// Decode sections that are already in memory and print every unit to `w`.
pub fn print_sections(
    sections: &DebugSections,
    options: &Options,
    print: &PrintOptions,
    w: &mut dyn Write,
) -> Result<ParseStats> {
    match print.format {
        Format::Text => {
            let mut printer = TextPrinter::new(w, print);
            parser::parse_sections(sections, options, &mut printer)
        }
        Format::Outline => {
            let mut printer = OutlinePrinter::new(w, print);
            parser::parse_sections(sections, options, &mut printer)
        }
    }
}
