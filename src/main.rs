use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use spinc::compiler::Compiler;
use spinc::compiler::con::resolve_con_block;
use spinc::config::CompilerConfig;
use spinc::diagnostic::{Diagnostic, ansi::AnsiRenderer, json, registry};
use spinc::lexer;
use spinc::symbols::SymbolTable;

#[derive(Parser, Debug)]
#[command(name = "spinc", version)]
#[command(about = "Compile Spin2 method-body statements to bytecode")]
struct Args {
    /// Source file: optional `NAME = value` lines, then statements
    #[arg(required_unless_present = "explain")]
    file: Option<PathBuf>,

    /// JSON symbol file with `constants`, `floats`, `locals` and `vars` sections
    #[arg(long)]
    symbols: Option<PathBuf>,

    /// JSON file overriding compiler limits
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for the image and for diagnostics
    #[arg(long, value_enum, default_value_t = Format::Hex)]
    format: Format,

    /// Log filter such as `debug` or `spinc=trace`; overrides RUST_LOG
    #[arg(long)]
    log: Option<String>,

    /// Print the long explanation of an error code and exit
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Hex,
    Json,
}

fn main() {
    let args = Args::parse();
    init_logging(args.log.as_deref());

    if let Some(code) = &args.explain {
        match registry::lookup(&code.to_ascii_uppercase()) {
            Some(entry) => {
                print!("{}", entry.long);
                return;
            }
            None => {
                eprintln!("Unknown error code '{code}'");
                process::exit(1);
            }
        }
    }
    let Some(path) = args.file.as_deref() else {
        eprintln!("Usage: spinc <file.spin2>");
        process::exit(1);
    };

    let source = read(path);
    let mut symbols = match &args.symbols {
        Some(p) => SymbolTable::from_json(&read(p)).unwrap_or_else(|e| {
            eprintln!("Invalid symbol file {}: {}", p.display(), e);
            process::exit(1);
        }),
        None => SymbolTable::new(),
    };
    let config = match &args.config {
        Some(p) => CompilerConfig::from_json(&read(p)).unwrap_or_else(|e| {
            eprintln!("Invalid config file {}: {}", p.display(), e);
            process::exit(1);
        }),
        None => CompilerConfig::default(),
    };

    let tokens = match lexer::lex(&source) {
        Ok(t) => t,
        Err(e) => report(Diagnostic::from(&e), &source, args.format),
    };

    let con = match resolve_con_block(&tokens, &symbols, &config) {
        Ok(con) => con,
        Err(e) => report(Diagnostic::from(&e), &source, args.format),
    };
    for (name, symbol) in &con.definitions {
        symbols.insert(name, *symbol);
    }
    info!(constants = con.definitions.len(), "con block resolved");

    let mut compiler = Compiler::new(&tokens, &symbols, config);
    compiler.cursor().reset(con.body_start);
    if let Err(e) = compiler.compile_method_body() {
        report(Diagnostic::from(&e), &source, args.format);
    }
    let image = compiler.into_image();

    match args.format {
        Format::Hex => print!("{}", image.hex_dump()),
        Format::Json => println!(
            "{}",
            serde_json::json!({ "bytes": image.as_bytes(), "length": image.offset() })
        ),
    }
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn report(d: Diagnostic, source: &str, format: Format) -> ! {
    let d = d.with_source(source);
    match format {
        Format::Hex => {
            let renderer = AnsiRenderer { use_color: std::io::stderr().is_terminal() };
            eprint!("{}", renderer.render(&d));
        }
        Format::Json => eprintln!("{}", json::render(&d)),
    }
    process::exit(1)
}
