//! Mare compiler CLI.
//!
//! ```text
//! marec [OPTIONS] <FILE>
//!
//! Arguments:
//!   <FILE>  Source file to compile (must end in `.mare`)
//!
//! Options:
//!   -o, --output <PATH>     Output path [default: a.out]
//!       --linker <PATH>     Link the object into an executable with this linker
//!       --show-cpu-features Print detected host CPU features
//!       --emit-ir           Dump the generated LLVM IR to stderr
//!   -h, --help              Print help
//!   -V, --version           Print version
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitCode};

use clap::Parser;
use colored::Colorize;
use inkwell::context::Context;
use inkwell::targets::{InitializationConfig, Target, TargetMachine};

use marec::codegen;
use marec::diagnostics::{CompileError, DiagnosticEmitter};
use marec::driver;

/// Required extension for Mare source files.
const SOURCE_EXTENSION: &str = "mare";

/// The Mare programming language compiler.
#[derive(Parser)]
#[command(name = "marec")]
#[command(author = "Mare Language Team")]
#[command(version)]
#[command(about = "The Mare programming language compiler", long_about = None)]
struct Cli {
    /// Source file to compile (must end in `.mare`)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output path: the object file, or the executable when --linker is given
    #[arg(short, long, value_name = "PATH", default_value = "a.out")]
    output: PathBuf,

    /// Linker executable used to produce an executable from the object file
    #[arg(long, value_name = "PATH")]
    linker: Option<PathBuf>,

    /// Print the detected host CPU and its feature set
    #[arg(long)]
    show_cpu_features: bool,

    /// Dump the generated LLVM IR to stderr
    #[arg(long)]
    emit_ir: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}

fn error(message: impl AsRef<str>) {
    eprintln!("{} {}", "error:".red().bold(), message.as_ref());
}

fn hint(message: impl AsRef<str>) {
    eprintln!("{}  {}", "hint:".cyan(), message.as_ref());
}

fn run(cli: &Cli) -> Result<(), ()> {
    if cli.file.extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXTENSION) {
        error(format!(
            "invalid source file extension: {}",
            cli.file.display()
        ));
        hint(format!("expected a file ending with `.{SOURCE_EXTENSION}`"));
        return Err(());
    }

    let source = fs::read_to_string(&cli.file).map_err(|e| {
        error(format!("failed to read {}: {e}", cli.file.display()));
    })?;

    if cli.show_cpu_features {
        print_cpu_features();
    }

    let filename = cli.file.display().to_string();
    let context = Context::create();
    let module = driver::compile(&context, &source).map_err(|err| match err {
        CompileError::Source(diagnostic) => {
            DiagnosticEmitter::new(&filename, &source).emit(&diagnostic);
        }
        other => error(other.to_string()),
    })?;

    if cli.emit_ir {
        eprintln!("{}", module.print_to_string().to_string());
    }

    let object_path = if cli.linker.is_some() {
        cli.output.with_extension("o")
    } else {
        cli.output.clone()
    };

    codegen::emit_object(&module, &object_path).map_err(|e| error(e.to_string()))?;
    println!(
        "{} {}",
        "-- compiled to object file:".green().bold(),
        object_path.display()
    );

    if let Some(linker) = &cli.linker {
        let status = Command::new(linker)
            .arg(&object_path)
            .arg("-o")
            .arg(&cli.output)
            .status()
            .map_err(|e| error(format!("failed to run linker {}: {e}", linker.display())))?;
        if !status.success() {
            error(format!("linker exited with {status}"));
            return Err(());
        }
        println!(
            "{} {}",
            "-- linked executable:".green().bold(),
            cli.output.display()
        );
    }

    Ok(())
}

fn print_cpu_features() {
    if Target::initialize_native(&InitializationConfig::default()).is_err() {
        return;
    }
    let triple = TargetMachine::get_default_triple();
    println!(
        "[*] detected target triple: {}",
        triple.as_str().to_string_lossy()
    );
    println!(
        "[*] host cpu: {}",
        TargetMachine::get_host_cpu_name().to_str().unwrap_or("generic")
    );
    println!(
        "[*] cpu features: {}",
        TargetMachine::get_host_cpu_features()
            .to_str()
            .unwrap_or("")
    );
}
