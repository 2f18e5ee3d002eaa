use anyhow::{bail, Context, Result};
use clap::Parser;
use minic_compiler::ast::{parse_to_ast, Node};
use minic_compiler::{codegen, semantic, CompileOptions, Diagnostic};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

mod catalog;

#[derive(Parser)]
#[command(name = "minic")]
#[command(about = "Compile a small C-like language to stack-machine assembly")]
struct Args {
    /// Path to the source file to compile
    file: Option<PathBuf>,

    /// Compile a built-in program (by name or number) instead of a file
    #[arg(long, conflicts_with = "file")]
    example: Option<String>,

    /// List the built-in programs and exit
    #[arg(long)]
    list_examples: bool,

    /// Print the syntax tree before analysis
    #[arg(long)]
    ast: bool,

    /// Stop after semantic analysis
    #[arg(long)]
    check: bool,

    /// Report lexical errors and diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Code generation options (JSON)
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Write the generated code here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Report<'a> {
    lexical_errors: Vec<String>,
    diagnostics: &'a [Diagnostic],
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_source(args: &Args) -> Result<String> {
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .with_context(|| format!("reading source file '{}'", path.display()));
    }
    let key = args.example.as_deref().unwrap_or("program");
    match catalog::find(key) {
        Some(demo) => {
            log::info!("compiling built-in program '{}'", demo.name);
            Ok(demo.source.trim().to_string())
        }
        None => bail!("unknown example '{}' (try --list-examples)", key),
    }
}

fn load_options(path: Option<&PathBuf>) -> Result<CompileOptions> {
    let Some(path) = path else {
        return Ok(CompileOptions::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading options file '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing options file '{}'", path.display()))
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_examples {
        for (i, demo) in catalog::DEMOS.iter().enumerate() {
            println!("{:>2}. {:<16} {}", i + 1, demo.name, demo.title);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let source = load_source(&args)?;
    let options = load_options(args.options.as_ref())?;

    let parsed = parse_to_ast(&source)?;

    if args.ast {
        for line in Node::Program(&parsed.program).render_tree() {
            println!("{}", line);
        }
        println!();
    }

    let diagnostics = semantic::analyze(&parsed.program);

    if args.json {
        let report = Report {
            lexical_errors: parsed.lexical_errors.iter().map(|e| e.to_string()).collect(),
            diagnostics: &diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for err in &parsed.lexical_errors {
            eprintln!("error: {}", err);
        }
        for d in &diagnostics {
            eprintln!("- {}", d);
        }
    }

    if !diagnostics.is_empty() {
        if !args.json {
            eprintln!("{} semantic error(s) found", diagnostics.len());
        }
        return Ok(ExitCode::FAILURE);
    }
    if !parsed.lexical_errors.is_empty() {
        if !args.json {
            eprintln!("{} lexical error(s) found", parsed.lexical_errors.len());
        }
        return Ok(ExitCode::FAILURE);
    }
    if !args.json {
        eprintln!("No semantic errors found");
    }
    if args.check {
        return Ok(ExitCode::SUCCESS);
    }

    let code = codegen::generate_with(&parsed.program, &options);
    match &args.output {
        Some(path) => {
            fs::write(path, &code).with_context(|| format!("writing '{}'", path.display()))?;
            eprintln!("Generated code written to {}", path.display());
        }
        None => print!("{}", code),
    }
    Ok(ExitCode::SUCCESS)
}
