use std::io;
use std::process::ExitCode;

use mimalloc::MiMalloc;

use ippcode18_sys::loader;
use ippcode18_sys::reporting::AsError;
use ippcode18_sys::vm::{ExitType, VirtualMachine};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

struct Options {
    source: String,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args) {
        ParsedArgs::Help => {
            print_help();
            return ExitCode::from(0);
        }
        ParsedArgs::Options(options) => options,
        ParsedArgs::UsageError(message) => {
            eprintln!("ippcode18: {message}");
            return ExitCode::from(10);
        }
    };

    let text = match std::fs::read_to_string(&options.source) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("ippcode18: cannot read '{}': {e}", options.source);
            return ExitCode::from(11);
        }
    };

    run(text)
}

fn run(source: String) -> ExitCode {
    let program = match loader::load(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", e.format_error());
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let mut vm = match VirtualMachine::new(program, io::stdin().lock(), io::stdout().lock(), io::stderr().lock()) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("{}", e.format_error());
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    match vm.run() {
        ExitType::Ok => ExitCode::from(0),
        ExitType::Error(e) => {
            eprintln!("{}", e.format_error());
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

enum ParsedArgs {
    Help,
    Options(Options),
    UsageError(String),
}

fn parse_args(args: &[String]) -> ParsedArgs {
    let mut source: Option<String> = None;
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return ParsedArgs::Help,
            "--source" => match iter.next() {
                Some(path) if source.is_none() => source = Some(path.clone()),
                Some(_) => return ParsedArgs::UsageError(String::from("duplicate --source flag")),
                None => return ParsedArgs::UsageError(String::from("--source requires a path argument")),
            },
            other => return ParsedArgs::UsageError(format!("unrecognized argument '{other}'")),
        }
    }

    match source {
        Some(source) => ParsedArgs::Options(Options { source }),
        None => ParsedArgs::UsageError(String::from("missing required --source PATH")),
    }
}

fn print_help() {
    println!("ippcode18 --source PATH");
    println!("Interprets an IPPcode18 XML program.");
    println!("Options:");
    println!("  --source PATH : path to the IPPcode18 XML source file (required)");
    println!("  -h --help     : show this message and exit");
}
