// Enable some rust 2018 idioms.
#![warn(bare_trait_objects)]
#![warn(unused_extern_crates)]

#[cfg(feature = "system_alloc")]
use std::alloc::System;

#[cfg(feature = "system_alloc")]
#[global_allocator]
static A: System = System;

#[macro_use]
extern crate log;

use std::io::{BufWriter, Write};
use std::process;

const OPT_FILE: &str = "file";

// Print format
const OPT_OUTPUT: &str = "format";
const OPT_OUTPUT_TEXT: &str = "text";
const OPT_OUTPUT_OUTLINE: &str = "outline";

// Decoding
const OPT_BLOCKS: &str = "blocks";
const OPT_LOCALS: &str = "locals";
const OPT_NO_FUNCTIONS: &str = "no-functions";
const OPT_NO_BODIES: &str = "no-bodies";
const OPT_NO_DEDUP: &str = "no-dedup";
const OPT_NO_RELOCATIONS: &str = "no-relocations";

// Print fields
const OPT_PRINT_ADDRESS: &str = "print-address";

fn flag(name: &'static str, help: &'static str) -> clap::Arg {
    clap::Arg::new(name)
        .long(name)
        .help(help)
        .action(clap::ArgAction::SetTrue)
}

fn main() {
    env_logger::init();

    let mut cmd = clap::Command::new("dwtree")
        .version(clap::crate_version!())
        .arg(
            clap::Arg::new(OPT_FILE)
                .help("Path of file to print")
                .value_name("FILE")
                .index(1)
                .required(true),
        )
        .arg(
            clap::Arg::new(OPT_OUTPUT)
                .short('o')
                .long(OPT_OUTPUT)
                .help("Output format")
                .value_name("FORMAT")
                .value_parser([OPT_OUTPUT_TEXT, OPT_OUTPUT_OUTLINE]),
        )
        .arg(flag(OPT_BLOCKS, "Decode lexical blocks as scopes"))
        .arg(flag(OPT_LOCALS, "Decode variables inside function bodies"))
        .arg(flag(OPT_NO_FUNCTIONS, "Skip functions and methods"))
        .arg(flag(OPT_NO_BODIES, "Skip the contents of function bodies"))
        .arg(flag(OPT_NO_DEDUP, "Print repeated definitions in full"))
        .arg(flag(
            OPT_NO_RELOCATIONS,
            "Do not apply relocations to object files",
        ))
        .arg(flag(
            OPT_PRINT_ADDRESS,
            "Print addresses of functions and variables",
        ));
    let matches = cmd.get_matches_mut();

    let mut options = dwtree::Options::default();
    options
        .lexical_blocks(matches.get_flag(OPT_BLOCKS))
        .local_variables(matches.get_flag(OPT_LOCALS))
        .deduplicate(!matches.get_flag(OPT_NO_DEDUP));
    options.functions = !matches.get_flag(OPT_NO_FUNCTIONS);
    options.function_bodies = !matches.get_flag(OPT_NO_BODIES);
    options.relocations = !matches.get_flag(OPT_NO_RELOCATIONS);

    let mut print = dwtree::PrintOptions::default();
    print.print_address = matches.get_flag(OPT_PRINT_ADDRESS);
    print.format = match matches.get_one::<String>(OPT_OUTPUT).map(String::as_str) {
        Some(OPT_OUTPUT_OUTLINE) => dwtree::Format::Outline,
        Some(OPT_OUTPUT_TEXT) | None => dwtree::Format::Text,
        Some(value) => cmd
            .error(
                clap::error::ErrorKind::InvalidValue,
                format!("invalid {} value: {}", OPT_OUTPUT, value),
            )
            .exit(),
    };

    let path = match matches.get_one::<String>(OPT_FILE) {
        Some(path) => path,
        None => cmd
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                format!("missing {}", OPT_FILE),
            )
            .exit(),
    };

    let stdout = std::io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    let stats = match dwtree::print_file(path, &options, &print, &mut writer) {
        Ok(stats) => stats,
        Err(e) => {
            error!("{}: {}", path, e);
            process::exit(1);
        }
    };
    if let Err(e) = writer.flush() {
        error!("{}: {}", path, e);
        process::exit(1);
    }

    info!(
        "{}: {} units, {} failed, {} skipped, {} unbalanced",
        path, stats.units, stats.failed_units, stats.skipped_units, stats.unbalanced_units
    );
    info!(
        "{}: {} definitions, {} replaced, {} relocations",
        path, stats.definitions, stats.replaced, stats.relocations
    );
}
