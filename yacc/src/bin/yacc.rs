//! Command-line front end: reads a `.y` grammar and writes `<prefix>.tab.rs`, and with
//! `-v`, the `<prefix>.output` report.
//!
//! `<prefix>.tab.rs` holds the prolog, then `mod yy` with the tables and the actions, then
//! the epilog.  The values on the parser stack have the type `YYSTYPE`; if the prolog does
//! not declare it, it is `i32`.

use clap::Parser;
use log::{debug, LevelFilter};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use yacc::output::output_parser_module;
use yacc::{reader, Options, DEFAULT_MAX_TABLE_SIZE};

#[derive(Debug, Parser)]
#[command(name = "yacc", version, about = "An LALR(1) parser generator", long_about = None)]
struct Args {
    /// Prefix of the output file names.
    #[arg(short = 'b', default_value = "y")]
    prefix: String,

    /// Write a description of the parser states to <prefix>.output.
    #[arg(short = 'v')]
    verbose: bool,

    /// Log the progress of each phase.
    #[arg(short = 't')]
    debug: bool,

    /// Limit on the size of the packed tables.
    #[arg(long = "max-table", default_value_t = DEFAULT_MAX_TABLE_SIZE)]
    max_table: usize,

    /// The grammar file.
    file: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    logger.default_format_timestamp(false);
    if args.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();
    debug!("{:?}", args);

    let options = Options {
        program_name: "yacc".to_string(),
        input_file_name: args.file.display().to_string(),
        verbose: args.verbose,
        max_table_size: args.max_table,
    };

    match run(&args, &options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprint!("{}", message);
            ExitCode::FAILURE
        }
    }
}

/// Returns the rendered diagnostics of a fatal error, or an I/O failure.
fn run(args: &Args, options: &Options) -> Result<(), String> {
    let program = options.program_name.as_str();
    let file = options.input_file_name.as_str();

    let text = fs::read_to_string(&args.file)
        .map_err(|e| format!("{}: f - cannot open \"{}\": {}\n", program, file, e))?;

    let read = reader::read_grammar(&text, options).map_err(|e| e.render(program, file))?;
    let generated = yacc::generate(read.builder, options).map_err(|e| e.render(program, file))?;
    eprint!("{}", generated.diagnostics.render(program, file));

    let parser = output_parser_module(&generated.grammar, &generated.tables, "yy")
        .map_err(|e| e.to_diagnostic().render(program, file))?;
    let mut code = read.prolog;
    if !code.contains("YYSTYPE") {
        code.push_str("pub type YYSTYPE = i32;\n");
    }
    code.push_str(&parser.to_string());
    code.push('\n');
    code.push_str(&read.epilog);

    let code_file = format!("{}.tab.rs", args.prefix);
    write_file(program, &code_file, &code)?;

    if let Some(report) = &generated.report {
        let output_file = format!("{}.output", args.prefix);
        write_file(program, &output_file, report)?;
    }
    Ok(())
}

fn write_file(program: &str, path: &str, contents: &str) -> Result<(), String> {
    debug!("writing {} ({} bytes)", path, contents.len());
    fs::write(path, contents)
        .map_err(|e| format!("{}: f - cannot open \"{}\": {}\n", program, path, e))
}
