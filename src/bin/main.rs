use std::{
    io::{self, Read},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use tracing::Level;

use exprc::{
    codegen::{self, eval},
    driver::{self, BuildError, Config, Driver},
    lexer, parser,
    util::fmt::{caret, print_expr_string, print_tokens_string},
};

/// Compiles an arithmetic expression to a native executable, runs it and
/// reports its exit status.
#[derive(clap::Parser, Debug)]
#[command(name = "exprc", version)]
struct Cli {
    /// Expression to compile. Read from stdin when omitted.
    expr: Option<String>,

    /// Print the token sequence before compiling.
    #[arg(long)]
    dump_tokens: bool,

    /// Print the syntax tree before compiling.
    #[arg(long)]
    dump_ast: bool,

    /// Print the generated C program and stop.
    #[arg(long, conflicts_with = "eval")]
    emit: bool,

    /// Evaluate in-process instead of building, printing the full signed
    /// value.
    #[arg(long)]
    eval: bool,

    /// C compiler to invoke (defaults to $EXPRC_CC, then `cc`).
    #[arg(long, value_name = "PATH")]
    cc: Option<PathBuf>,

    /// Directory for the intermediate source and the executable.
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Capture the program's output and print it after it exits.
    #[arg(long)]
    capture: bool,

    /// Increase logging verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_max_level(level)
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode, String> {
    let src = match &cli.expr {
        Some(expr) => expr.clone(),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            buf
        }
    };

    let tokens = lexer::lex_in_new(&src);
    if cli.dump_tokens {
        print!("{}", print_tokens_string(&src, &tokens));
    }

    let expr = parser::parse(&src, &tokens).map_err(|e| caret(&src, e.span, &e.inner))?;
    if cli.dump_ast {
        print!("{}", print_expr_string(&expr));
    }

    if cli.eval {
        let lowered = codegen::lower(&expr);
        let value = eval::evaluate(&lowered).map_err(|e| e.to_string())?;
        println!("{value}");
        return Ok(ExitCode::SUCCESS);
    }

    let program = codegen::generate(&expr);
    if cli.emit {
        print!("{program}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = Config::from_env();
    if let Some(cc) = &cli.cc {
        config.compiler.clone_from(cc);
    }
    if let Some(work_dir) = &cli.work_dir {
        config.work_dir.clone_from(work_dir);
    }

    let execution = Driver::native(config, cli.capture)
        .build_and_run(program)
        .map_err(report)?;

    if let Some(output) = &execution.output {
        print!("{output}");
    }
    println!("{}", execution.code);
    Ok(exit_code(execution.code))
}

fn report(error: driver::Error) -> String {
    match error {
        driver::Error::Build {
            source: BuildError::ToolchainFailure { status, output },
            program,
        } => {
            let status = status.map_or_else(|| "signal".to_string(), |s| s.to_string());
            format!("toolchain failed ({status}):\n{output}\ngenerated program:\n{program}")
        }
        other => other.to_string(),
    }
}

/// Statuses outside `u8` can't be forwarded as-is; only the low byte is
/// observable on Unix anyway.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(code as u8)
}
