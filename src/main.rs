//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use aolc::{
    arch::Arch,
    codegen,
    error::Diagnostics,
    lex::{self, TokenKind},
    parse,
    source::Source,
};

use anyhow::{self, bail, Context};
use bitflags::bitflags;
use clap::{self, crate_version, Arg, Command};

use std::{
    fs::File,
    io::{self, BufWriter},
    mem,
    rc::Rc,
    str::FromStr,
};

bitflags! {
    struct DriverOptions: u8 {
        const VERBOSE  = 0x01;
        const LEX_ONLY = 0x02;
    }
}

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = Command::new("aolc")
        .version(crate_version!())
        .about("AOL compiler")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .help("Source file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .default_value("a.pasm")
                .help("Output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Report progress of each stage"),
        )
        .arg(
            Arg::new("compile-only")
                .short('c')
                .long("compile-only")
                .help("Emit assembly only (the default)"),
        )
        .arg(
            Arg::new("lexout")
                .long("lexout")
                .help("Dump tokens and stop"),
        )
        .arg(
            Arg::new("arch")
                .short('a')
                .long("arch")
                .takes_value(true)
                .value_name("ARCH")
                .default_value("amd64")
                .help("Target architecture"),
        )
        .arg(
            Arg::new("bits")
                .short('b')
                .long("bits")
                .takes_value(true)
                .value_name("N")
                .default_value("64")
                .help("Target word size"),
        )
        .get_matches();

    // Se extraen argumentos necesarios
    let mut options = DriverOptions::empty();
    options.set(DriverOptions::VERBOSE, args.is_present("verbose"));
    options.set(DriverOptions::LEX_ONLY, args.is_present("lexout"));

    let arch = args.value_of("arch").unwrap_or("amd64");
    let bits = args.value_of("bits").unwrap_or("64");
    let bits = u32::from_str(bits).with_context(|| format!("Invalid word size: {}", bits))?;
    let arch = Arch::from_str(arch)?.with_bits(bits)?;

    let input = args.value_of("input").context("No input file")?;
    let output = args.value_of("output").unwrap_or("a.pasm");

    let source = Source::read(input).with_context(|| format!("Failed to read: {}", input))?;
    let source = Rc::new(source);
    let verbose = options.contains(DriverOptions::VERBOSE);

    let tokens = lex::tokenize(source.text());
    if verbose {
        eprintln!("lex: {} tokens", tokens.len());
    }

    if options.contains(DriverOptions::LEX_ONLY) {
        for token in tokens.iter().filter(|token| token.kind() != TokenKind::Eof) {
            println!("{}", token);
        }

        return Ok(());
    }

    let (ast, errors) = parse::parse(&tokens);
    let syntax = Diagnostics::from(errors)
        .kind("syntax error")
        .with_source(Rc::clone(&source));

    eprint!("{}", syntax);
    if verbose {
        eprintln!("parse: {} nodes, {} errors", ast.len(), syntax.len());
    }

    let mut compiled = codegen::compile(&ast).context("Failed to format assembly")?;
    let semantic = Diagnostics::from(mem::take(&mut compiled.errors)).with_source(source);

    eprint!("{}", semantic);
    if verbose {
        eprintln!(
            "codegen: {} functions, {} bytes of {} assembly, {} errors",
            compiled.functions.len(),
            compiled.assembly.len(),
            arch,
            semantic.len()
        );
    }

    // La salida se escribe aun si hubo errores
    match output {
        "-" => {
            let stdout = io::stdout();
            compiled
                .write_to(stdout.lock())
                .context("Failed to emit to stdout")?;
        }

        path => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            compiled
                .write_to(BufWriter::new(file))
                .with_context(|| format!("Failed to emit to file: {}", path))?;
        }
    }

    let failures = syntax.len() + semantic.len();
    if failures > 0 {
        bail!("Compilation failed with {} error(s)", failures);
    }

    Ok(())
}
