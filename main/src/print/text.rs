use std::io::Write;

use parser::{Access, DedupTable, Element, ElementId, ElementKind, Sink, UnitTree};

use crate::print::{declare, TypeNames};
use crate::{PrintOptions, Result};

/// Print units as pseudo-C declarations.
pub struct TextPrinter<'w> {
    w: &'w mut dyn Write,
    options: PrintOptions,
    names: TypeNames,
    namespaces: usize,
}

impl<'w> TextPrinter<'w> {
    pub fn new(w: &'w mut dyn Write, options: &PrintOptions) -> TextPrinter<'w> {
        TextPrinter {
            w,
            options: options.clone(),
            names: TypeNames::default(),
            namespaces: 0,
        }
    }

    fn line(&mut self, indent: usize, text: &str) -> Result<()> {
        for _ in 0..indent {
            self.w.write_all(b"\t")?;
        }
        writeln!(self.w, "{}", text)?;
        Ok(())
    }

    fn indent(&self, element: &Element) -> usize {
        self.namespaces + element.level().saturating_sub(1)
    }

    fn print_unit(&mut self, tree: &UnitTree) -> Result<()> {
        let info = tree.info();
        writeln!(
            self.w,
            "// unit 0x{:x}: {}",
            info.offset(),
            info.name().unwrap_or("<anon>")
        )?;
        if let Some(producer) = info.producer() {
            writeln!(self.w, "// producer: {}", producer)?;
        }
        if !tree.is_balanced() {
            writeln!(self.w, "// warning: truncated unit")?;
        }
        writeln!(self.w)?;

        // Blocks still waiting for their closing line, innermost last.
        let mut open: Vec<(usize, usize, String)> = Vec::new();
        let mut skip: Option<usize> = None;
        let elements = tree.elements();
        for (index, element) in elements.iter().enumerate() {
            let scoped = match element.kind() {
                ElementKind::Namespace | ElementKind::NamespaceEnd => true,
                _ => false,
            };
            if let Some(level) = skip {
                if element.level() > level && !scoped {
                    continue;
                }
                skip = None;
            }
            while let Some(&(level, _, _)) = open.last() {
                if element.level() > level {
                    break;
                }
                if let Some((_, indent, close)) = open.pop() {
                    self.line(indent, &close)?;
                }
            }

            let has_children = elements
                .get(index + 1)
                .map(|next| next.level() > element.level())
                .unwrap_or(false);

            if let Some(first) = tree.replacement(element.id()) {
                if self.options.print_replaced {
                    self.print_reference(tree, element, first)?;
                }
                skip = Some(element.level());
                continue;
            }

            match element.kind() {
                ElementKind::Namespace => {
                    let text = format!("namespace {} {{", element.name().unwrap_or("<anon>"));
                    self.line(self.namespaces, &text)?;
                    self.namespaces += 1;
                }
                ElementKind::NamespaceEnd => {
                    self.namespaces = self.namespaces.saturating_sub(1);
                    let name = tree
                        .get(element.id())
                        .and_then(Element::name)
                        .unwrap_or("<anon>");
                    let text = format!("}} // namespace {}", name);
                    self.line(self.namespaces, &text)?;
                }
                ElementKind::Struct | ElementKind::Class | ElementKind::Union => {
                    if let Some(close) = self.print_aggregate(tree, element)? {
                        open.push((element.level(), self.indent(element), close));
                    }
                }
                ElementKind::Enum => {
                    if let Some(close) = self.print_enum(tree, element)? {
                        open.push((element.level(), self.indent(element), close));
                    }
                }
                ElementKind::Typedef => {
                    let text = format!(
                        "typedef {};",
                        declare(
                            &self.names.type_name(tree, element.type_id()),
                            element.name().unwrap_or("<anon>")
                        )
                    );
                    self.line(self.indent(element), &text)?;
                }
                ElementKind::BaseType => {
                    let mut text = format!("// base type {}", element.name().unwrap_or("<anon>"));
                    if let Some(size) = element.byte_size() {
                        text.push_str(&format!(", size {}", size));
                    }
                    self.line(self.indent(element), &text)?;
                }
                ElementKind::Variable => {
                    let text = self.variable(tree, element);
                    self.line(self.indent(element), &text)?;
                }
                ElementKind::Subprogram => {
                    let mut text = self.prototype(tree, element);
                    if has_children && !element.is_declaration() {
                        text.push_str(" {");
                        open.push((element.level(), self.indent(element), "}".into()));
                    } else {
                        text.push(';');
                    }
                    self.address(&mut text, element);
                    self.line(self.indent(element), &text)?;
                }
                ElementKind::LexicalBlock => {
                    if has_children {
                        self.line(self.indent(element), "{")?;
                        open.push((element.level(), self.indent(element), "}".into()));
                    }
                }
                // Anonymous types are printed where they are used.
                _ => {}
            }
        }
        while let Some((_, indent, close)) = open.pop() {
            self.line(indent, &close)?;
        }
        writeln!(self.w)?;
        Ok(())
    }

    fn print_reference(&mut self, tree: &UnitTree, element: &Element, first: ElementId) -> Result<()> {
        let name = if element.kind().is_type() {
            self.names.type_name(tree, element.id())
        } else {
            element.name().unwrap_or("<anon>").to_string()
        };
        let text = format!("{}; // defined at {}", name, first);
        self.line(self.indent(element), &text)
    }

    /// Print the opening of a struct, class or union and its members.
    ///
    /// Returns the closing line, or `None` for a declaration.
    fn print_aggregate(&mut self, tree: &UnitTree, element: &Element) -> Result<Option<String>> {
        let indent = self.indent(element);
        let mut text = self.names.type_name(tree, element.id());
        if element.is_declaration() {
            text.push(';');
            self.line(indent, &text)?;
            return Ok(None);
        }

        let compound = element.compound();
        let parents = compound.map(|compound| compound.parents()).unwrap_or(&[]);
        for (i, parent) in parents.iter().enumerate() {
            text.push_str(if i == 0 { " : " } else { ", " });
            match parent.access() {
                Some(Access::Public) => text.push_str("public "),
                Some(Access::Protected) => text.push_str("protected "),
                Some(Access::Private) => text.push_str("private "),
                None => {}
            }
            text.push_str(&self.names.type_name(tree, parent.type_id()));
        }
        text.push_str(" {");
        self.line(indent, &text)?;

        if let Some(compound) = compound {
            for member in compound.members() {
                let text = self.member(tree, member);
                self.line(indent + 1, &text)?;
            }
            for method in compound.methods() {
                let mut text = self.prototype(tree, method);
                text.push(';');
                self.line(indent + 1, &text)?;
            }
        }

        let close = match element.byte_size() {
            Some(size) => format!("}}; // size {}", size),
            None => {
                debug!("struct with no size");
                "};".into()
            }
        };
        Ok(Some(close))
    }

    fn print_enum(&mut self, tree: &UnitTree, element: &Element) -> Result<Option<String>> {
        let indent = self.indent(element);
        let mut text = self.names.type_name(tree, element.id());
        if element.is_declaration() {
            text.push(';');
            self.line(indent, &text)?;
            return Ok(None);
        }
        if element.type_id().is_some() {
            text.push_str(" : ");
            text.push_str(&self.names.type_name(tree, element.type_id()));
        }
        text.push_str(" {");
        self.line(indent, &text)?;
        if let Some(compound) = element.compound() {
            for enumerator in compound.enumerators() {
                let mut text = enumerator.name().unwrap_or("<anon>").to_string();
                if let Some(value) = enumerator.value() {
                    text.push_str(&format!(" = {}", value));
                }
                text.push(',');
                self.line(indent + 1, &text)?;
            }
        }
        Ok(Some("};".into()))
    }

    fn member(&self, tree: &UnitTree, member: &Element) -> String {
        let mut text = declare(
            &self.names.type_name(tree, member.type_id()),
            member.name().unwrap_or("<anon>"),
        );
        if let Some(bits) = member.bit_size() {
            text.push_str(&format!(" : {}", bits));
        }
        text.push(';');
        if let Some(bit_offset) = member.data_bit_offset() {
            text.push_str(&format!(" // bit offset {}", bit_offset));
        } else if let Some(offset) = member.offset() {
            text.push_str(&format!(" // offset {}", offset));
        }
        text
    }

    fn variable(&self, tree: &UnitTree, element: &Element) -> String {
        let mut text = String::new();
        if element.is_declaration() && element.is_external() {
            text.push_str("extern ");
        }
        text.push_str(&declare(
            &self.names.type_name(tree, element.type_id()),
            element.name().unwrap_or("<anon>"),
        ));
        if let Some(value) = element.const_value() {
            text.push_str(&format!(" = {}", value));
        }
        text.push(';');
        self.address(&mut text, element);
        text
    }

    /// Format `ret name(type name, ...)` without the trailing `;`.
    fn prototype(&self, tree: &UnitTree, element: &Element) -> String {
        let mut text = declare(
            &self.names.type_name(tree, element.type_id()),
            element.name().unwrap_or("<anon>"),
        );
        text.push('(');
        let parameters = element
            .compound()
            .map(|compound| compound.parameters())
            .unwrap_or(&[]);
        for (i, parameter) in parameters.iter().enumerate() {
            if i > 0 {
                text.push_str(", ");
            }
            if parameter.is_ellipsis() {
                text.push_str("...");
                continue;
            }
            let ty = self.names.type_name(tree, parameter.type_id());
            match parameter.name() {
                Some(name) => text.push_str(&declare(&ty, name)),
                None => text.push_str(&ty),
            }
        }
        text.push(')');
        text
    }

    fn address(&self, text: &mut String, element: &Element) {
        if self.options.print_address {
            if let Some(address) = element.address() {
                text.push_str(&format!(" // address 0x{:x}", address));
            }
        }
    }
}

impl<'w, 'input> Sink<'input> for TextPrinter<'w> {
    fn unit_complete(&mut self, tree: UnitTree<'input>, dedup: &DedupTable<'input>) -> Result<()> {
        self.print_unit(&tree)?;
        self.names.record(&tree, dedup);
        Ok(())
    }
}
