//! # cesiumc
//!
//! This binary is the compiler of Cesium. It combines the lexer, parser,
//! optimizer, and class-file emitter into a single application.
mod cli;

use cli::Cli;

use std::fs;
use std::process::ExitCode;

use log::{error, info};

fn main() -> ExitCode {
    let args = Cli::init();

    simple_logger::init_with_level((&args.verbosity).into()).unwrap();

    let program_name = args
        .program_name
        .clone()
        .unwrap_or_else(|| {
            args.source
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Main".to_string())
        });

    let source = match fs::read_to_string(&args.source) {
        Ok(source) => source,
        Err(io_error) => {
            error!("could not read '{}': {io_error}", args.source.display());
            return ExitCode::FAILURE;
        }
    };

    info!("lexing {}", args.source.display());
    let tokens = match cesium::lexer::Lexer::new(&source).lex() {
        Ok(tokens) => tokens,
        Err(lex_error) => {
            error!("{lex_error}");
            return ExitCode::FAILURE;
        }
    };

    info!("parsing {}", args.source.display());
    let program = match cesium::parser::parse(tokens) {
        Ok(program) => program,
        Err(parse_error) => {
            error!("{parse_error}");
            return ExitCode::FAILURE;
        }
    };

    if args.emit_ast {
        info!("parsed AST:\n{program:#?}");
    }

    info!("optimizing");
    let program = cesium::optimizer::optimize(program);

    if args.emit_optimized_ast {
        info!("optimized AST:\n{program:#?}");
    }

    info!("emitting class '{program_name}'");
    let class_bytes = match cesium::emitter::emit(&program, &program_name) {
        Ok(bytes) => bytes,
        Err(codegen_error) => {
            error!("{codegen_error}");
            return ExitCode::FAILURE;
        }
    };

    let output_path = format!("{program_name}.class");
    if let Err(io_error) = fs::write(&output_path, class_bytes) {
        error!("could not write '{output_path}': {io_error}");
        return ExitCode::FAILURE;
    }

    info!("wrote {output_path}");
    ExitCode::SUCCESS
}
