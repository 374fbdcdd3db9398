use dwtree::{print_sections, DebugSections, Format, Options, PrintOptions};
use gimli::{DwAt, DwForm, DwTag, RunTimeEndian};

fn uleb(buf: &mut Vec<u8>, value: u64) {
    gimli::leb128::write::unsigned(buf, value).unwrap();
}

const CU: u64 = 1;
const BASE: u64 = 2;
const STRUCT: u64 = 3;
const MEMBER: u64 = 4;
const POINTER: u64 = 5;
const VARIABLE: u64 = 6;
const NAMESPACE: u64 = 7;
const SUBPROGRAM: u64 = 8;
const PARAMETER: u64 = 9;
const VARIABLE_ADDR: u64 = 10;

fn abbrevs() -> Vec<u8> {
    let table: &[(u64, DwTag, bool, &[(DwAt, DwForm)])] = &[
        (
            CU,
            gimli::DW_TAG_compile_unit,
            true,
            &[
                (gimli::DW_AT_name, gimli::DW_FORM_string),
                (gimli::DW_AT_producer, gimli::DW_FORM_string),
            ],
        ),
        (
            BASE,
            gimli::DW_TAG_base_type,
            false,
            &[
                (gimli::DW_AT_name, gimli::DW_FORM_string),
                (gimli::DW_AT_byte_size, gimli::DW_FORM_data1),
                (gimli::DW_AT_encoding, gimli::DW_FORM_data1),
            ],
        ),
        (
            STRUCT,
            gimli::DW_TAG_structure_type,
            true,
            &[
                (gimli::DW_AT_name, gimli::DW_FORM_string),
                (gimli::DW_AT_byte_size, gimli::DW_FORM_data1),
            ],
        ),
        (
            MEMBER,
            gimli::DW_TAG_member,
            false,
            &[
                (gimli::DW_AT_name, gimli::DW_FORM_string),
                (gimli::DW_AT_type, gimli::DW_FORM_ref4),
                (gimli::DW_AT_data_member_location, gimli::DW_FORM_data1),
            ],
        ),
        (
            POINTER,
            gimli::DW_TAG_pointer_type,
            false,
            &[
                (gimli::DW_AT_byte_size, gimli::DW_FORM_data1),
                (gimli::DW_AT_type, gimli::DW_FORM_ref4),
            ],
        ),
        (
            VARIABLE,
            gimli::DW_TAG_variable,
            false,
            &[
                (gimli::DW_AT_name, gimli::DW_FORM_string),
                (gimli::DW_AT_type, gimli::DW_FORM_ref4),
            ],
        ),
        (
            NAMESPACE,
            gimli::DW_TAG_namespace,
            true,
            &[(gimli::DW_AT_name, gimli::DW_FORM_string)],
        ),
        (
            SUBPROGRAM,
            gimli::DW_TAG_subprogram,
            true,
            &[
                (gimli::DW_AT_name, gimli::DW_FORM_string),
                (gimli::DW_AT_type, gimli::DW_FORM_ref4),
            ],
        ),
        (
            PARAMETER,
            gimli::DW_TAG_formal_parameter,
            false,
            &[
                (gimli::DW_AT_name, gimli::DW_FORM_string),
                (gimli::DW_AT_type, gimli::DW_FORM_ref4),
            ],
        ),
        (
            VARIABLE_ADDR,
            gimli::DW_TAG_variable,
            false,
            &[
                (gimli::DW_AT_name, gimli::DW_FORM_string),
                (gimli::DW_AT_type, gimli::DW_FORM_ref_addr),
            ],
        ),
    ];
    let mut buf = Vec::new();
    for (code, tag, children, attrs) in table {
        uleb(&mut buf, *code);
        uleb(&mut buf, tag.0.into());
        buf.push(*children as u8);
        for (name, form) in attrs.iter() {
            uleb(&mut buf, name.0.into());
            uleb(&mut buf, form.0.into());
        }
        buf.extend(&[0, 0]);
    }
    buf.push(0);
    buf
}

/// A DWARF 4 unit with 8 byte addresses.
struct Unit {
    start: u32,
    buf: Vec<u8>,
}

impl Unit {
    fn new(start: usize) -> Self {
        Unit {
            start: start as u32,
            buf: Vec::new(),
        }
    }

    /// Unit relative offset of the next entry.
    fn offset(&self) -> u32 {
        11 + self.buf.len() as u32
    }

    fn code(&mut self, code: u64) -> &mut Self {
        uleb(&mut self.buf, code);
        self
    }

    fn string(&mut self, value: &str) -> &mut Self {
        self.buf.extend(value.as_bytes());
        self.buf.push(0);
        self
    }

    fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    fn u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend(&value.to_le_bytes());
        self
    }

    fn end(&mut self) -> &mut Self {
        self.buf.push(0);
        self
    }

    fn point(&mut self, int: u32) -> u32 {
        let point = self.offset();
        self.code(STRUCT).string("Point").u8(8);
        self.code(MEMBER).string("x").u32(int).u8(0);
        self.code(MEMBER).string("y").u32(int).u8(4);
        self.end();
        point
    }

    fn bytes(&self) -> Vec<u8> {
        let length = 7 + self.buf.len() as u32;
        let mut out = length.to_le_bytes().to_vec();
        out.extend(&4u16.to_le_bytes());
        out.extend(&0u32.to_le_bytes());
        out.push(8);
        out.extend(&self.buf);
        out
    }
}

struct Fixture {
    debug_info: Vec<u8>,
    /// Global offset of `struct Point` in the first unit.
    point: u32,
}

fn fixture() -> Fixture {
    let mut a = Unit::new(0);
    a.code(CU).string("a.c").string("cc 1.0");
    let int = a.offset();
    a.code(BASE).string("int").u8(4).u8(gimli::DW_ATE_signed.0);
    let point = a.point(int);
    let pointer = a.offset();
    a.code(POINTER).u8(8).u32(point);
    a.code(NAMESPACE).string("geo");
    a.code(VARIABLE).string("origin").u32(point);
    a.end();
    a.code(SUBPROGRAM).string("norm").u32(int);
    a.code(PARAMETER).string("p").u32(pointer);
    a.end();
    a.end();
    let mut debug_info = a.bytes();

    let mut b = Unit::new(debug_info.len());
    b.code(CU).string("b.c").string("cc 1.0");
    let int = b.offset();
    b.code(BASE).string("int").u8(4).u8(gimli::DW_ATE_signed.0);
    b.point(int);
    // Reference into the first unit.
    b.code(VARIABLE_ADDR).string("last").u32(a.start + pointer);
    b.end();
    debug_info.extend(b.bytes());

    Fixture {
        debug_info,
        point: a.start + point,
    }
}

fn sections(debug_info: &[u8]) -> DebugSections {
    let mut sections = DebugSections::new(RunTimeEndian::Little);
    sections.debug_info = debug_info.into();
    sections.debug_abbrev = abbrevs().into();
    sections
}

fn render(options: &Options, print: &PrintOptions) -> (String, Fixture) {
    let _ = env_logger::builder().is_test(true).try_init();
    let fixture = fixture();
    let mut out = Vec::new();
    {
        let sections = sections(&fixture.debug_info);
        let stats = print_sections(&sections, options, print, &mut out).unwrap();
        assert_eq!(stats.units, 2);
    }
    (String::from_utf8(out).unwrap(), fixture)
}

#[test]
fn text_prints_first_definition_only() {
    let (text, fixture) = render(&Options::default(), &PrintOptions::default());
    println!("{}", text);
    assert_eq!(text.matches("struct Point {").count(), 1);
    assert!(text.contains("\tint x; // offset 0\n"));
    assert!(text.contains("\tint y; // offset 4\n"));
    assert!(text.contains("}; // size 8\n"));
    assert!(text.contains(&format!(
        "struct Point; // defined at 0x{:x}\n",
        fixture.point
    )));
}

#[test]
fn text_declarations() {
    let (text, _) = render(&Options::default(), &PrintOptions::default());
    assert!(text.contains("// unit 0x0: a.c\n// producer: cc 1.0\n"));
    assert!(text.contains("// base type int, size 4\n"));
    assert!(text.contains("namespace geo {\n\tstruct Point origin;\n} // namespace geo\n"));
    assert!(text.contains("int norm(struct Point *p);\n"));
    // The pointer type is resolved from the first unit.
    assert!(text.contains("struct Point *last;\n"));
}

#[test]
fn replaced_definitions_hidden() {
    let print = PrintOptions {
        print_replaced: false,
        ..Default::default()
    };
    let (text, _) = render(&Options::default(), &print);
    assert!(!text.contains("defined at"));
    let second = text.split("b.c").nth(1).unwrap();
    assert!(!second.contains("struct Point {"));
    assert!(!second.contains("struct Point;"));
    assert!(second.contains("struct Point *last;"));
}

#[test]
fn no_dedup_prints_both_bodies() {
    let mut options = Options::default();
    options.deduplicate(false);
    let (text, _) = render(&options, &PrintOptions::default());
    assert_eq!(text.matches("struct Point {").count(), 2);
    assert!(!text.contains("defined at"));
}

#[test]
fn outline() {
    let print = PrintOptions {
        format: Format::Outline,
        ..Default::default()
    };
    let (text, fixture) = render(&Options::default(), &print);
    println!("{}", text);
    assert!(text.starts_with("unit 0x0 v4 a.c\n"));
    assert_eq!(text.matches("Struct level=1 name=Point size=8").count(), 2);
    assert!(text.contains(&format!("replaced by 0x{:x}\n", fixture.point)));
    assert!(text.contains("Member level=2 name=x offset=0 type="));
    assert!(text.contains("parameter p type="));
    assert!(text.contains("NamespaceEnd level=1\n"));
}

#[test]
fn functions_disabled() {
    let mut options = Options::default();
    options.functions = false;
    let (text, _) = render(&options, &PrintOptions::default());
    assert!(!text.contains("norm"));
    assert!(text.contains("struct Point origin;"));
}
