//! Command-line argument parsing for `cesiumc`, in the shape of `y-lang`'s
//! `src/bin/why/cli.rs` — a `clap`-derived struct plus a `LogLevel` enum
//! that maps onto `log::Level`.
use clap::{Parser, ValueEnum};

/// Struct containing the CLI configuration for `cesiumc`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// The path to the Cesium source file to compile.
    #[arg(index = 1)]
    pub source: std::path::PathBuf,

    /// The name of the emitted class (and its `.class` file). Defaults to
    /// the source file's stem.
    #[arg(index = 2)]
    pub program_name: Option<String>,

    /// Specify the log level of the compiler.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,

    /// Dump the parsed AST before optimization (for debugging).
    #[arg(long)]
    pub emit_ast: bool,

    /// Dump the AST after optimization (for debugging).
    #[arg(long)]
    pub emit_optimized_ast: bool,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of `cesiumc`.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors will be logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// Also log warnings.
    #[value(alias("1"))]
    Warn,

    /// Also log information about the general state of the compiler, e.g.,
    /// which pass is currently running.
    #[value(alias("2"))]
    Info,

    /// Log everything which happens internally in the compiler.
    #[value(alias("3"))]
    Debug,

    /// Log extra information, such as per-token lexer output.
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}
