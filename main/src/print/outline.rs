use std::io::Write;

use parser::{DedupTable, Element, ElementId, Sink, UnitTree};

use crate::print::TypeNames;
use crate::{PrintOptions, Result};

/// Print one line per element, for inspecting the decoded tree.
pub struct OutlinePrinter<'w> {
    w: &'w mut dyn Write,
    options: PrintOptions,
    names: TypeNames,
}

impl<'w> OutlinePrinter<'w> {
    pub fn new(w: &'w mut dyn Write, options: &PrintOptions) -> OutlinePrinter<'w> {
        OutlinePrinter {
            w,
            options: options.clone(),
            names: TypeNames::default(),
        }
    }

    fn print_unit(&mut self, tree: &UnitTree) -> Result<()> {
        let info = tree.info();
        write!(
            self.w,
            "unit 0x{:x} v{} {}",
            info.offset(),
            info.version(),
            info.name().unwrap_or("<anon>")
        )?;
        if let Some(language) = info.language() {
            write!(self.w, " {}", language)?;
        }
        if let Some(package) = info.package_name() {
            write!(self.w, " package={}", package)?;
        }
        if !tree.is_balanced() {
            write!(self.w, " unbalanced")?;
        }
        writeln!(self.w)?;

        for element in tree.elements() {
            let indent = element.level();
            self.print_element(tree, element, indent)?;
            if let Some(first) = tree.replacement(element.id()) {
                self.indent(indent + 1)?;
                writeln!(self.w, "replaced by {}", first)?;
                continue;
            }
            if let Some(compound) = element.compound() {
                for parent in compound.parents() {
                    let base = self.type_ref(tree, parent.type_id());
                    self.indent(indent + 1)?;
                    writeln!(self.w, "inherit {}", base)?;
                }
                for member in compound.members() {
                    self.print_element(tree, member, indent + 1)?;
                }
                for enumerator in compound.enumerators() {
                    self.indent(indent + 1)?;
                    write!(self.w, "enumerator {}", enumerator.name().unwrap_or("<anon>"))?;
                    if let Some(value) = enumerator.value() {
                        write!(self.w, " = {}", value)?;
                    }
                    writeln!(self.w)?;
                }
                for parameter in compound.parameters() {
                    self.indent(indent + 1)?;
                    if parameter.is_ellipsis() {
                        writeln!(self.w, "parameter ...")?;
                        continue;
                    }
                    let ty = self.type_ref(tree, parameter.type_id());
                    writeln!(
                        self.w,
                        "{} parameter {} type={}",
                        parameter.id(),
                        parameter.name().unwrap_or("<anon>"),
                        ty
                    )?;
                }
                for method in compound.methods() {
                    self.print_element(tree, method, indent + 1)?;
                }
                for dimension in compound.dimensions() {
                    self.indent(indent + 1)?;
                    match dimension.len() {
                        Some(len) => writeln!(self.w, "dimension {}", len)?,
                        None => writeln!(self.w, "dimension ?")?,
                    }
                }
            }
        }
        Ok(())
    }

    fn print_element(&mut self, tree: &UnitTree, element: &Element, indent: usize) -> Result<()> {
        self.indent(indent)?;
        write!(
            self.w,
            "{} {:?} level={}",
            element.id(),
            element.kind(),
            element.level()
        )?;
        if let Some(name) = element.name() {
            write!(self.w, " name={}", name)?;
        }
        if let Some(size) = element.byte_size() {
            write!(self.w, " size={}", size)?;
        }
        if let Some(offset) = element.offset() {
            write!(self.w, " offset={}", offset)?;
        }
        if element.type_id().is_some() {
            let ty = self.type_ref(tree, element.type_id());
            write!(self.w, " type={}", ty)?;
        }
        if element.is_declaration() {
            write!(self.w, " declaration")?;
        }
        if self.options.print_address {
            if let Some(address) = element.address() {
                write!(self.w, " address=0x{:x}", address)?;
            }
        }
        writeln!(self.w)?;
        Ok(())
    }

    fn type_ref(&self, tree: &UnitTree, id: ElementId) -> String {
        format!("{} ({})", id, self.names.type_name(tree, id))
    }

    fn indent(&mut self, indent: usize) -> Result<()> {
        for _ in 0..indent {
            self.w.write_all(b"  ")?;
        }
        Ok(())
    }
}

impl<'w, 'input> Sink<'input> for OutlinePrinter<'w> {
    fn unit_complete(&mut self, tree: UnitTree<'input>, dedup: &DedupTable<'input>) -> Result<()> {
        self.print_unit(&tree)?;
        self.names.record(&tree, dedup);
        Ok(())
    }
}
