use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use pledge::DispatchKind;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod repl;
mod script;

use script::Session;

#[derive(Parser)]
#[command(name = "pledge", about = "Build and settle promise chains by hand")]
struct Cli {
    /// Script of commands to run, one per line
    script: Option<PathBuf>,
    /// How reactions are dispatched: synchronous or microtask
    #[arg(long, default_value = "synchronous")]
    dispatch: DispatchKind,
    /// Run a single command and exit
    #[arg(long)]
    eval: Option<String>,
    /// Print version and exit
    #[arg(long)]
    version: bool,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if cli.version {
        println!(
            "{} {}",
            "pledge".bright_cyan().bold(),
            env!("CARGO_PKG_VERSION").bright_black()
        );
        return;
    }

    let mut session = match Session::new(cli.dispatch) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            process::exit(1);
        }
    };

    if let Some(line) = cli.eval {
        if !run_source(&mut session, &line, "--eval") {
            process::exit(1);
        }
        return;
    }

    let Some(path) = cli.script else {
        if let Err(err) = repl::run(session, cli.dispatch) {
            eprintln!("{} {err}", "repl error:".red().bold());
            process::exit(1);
        }
        return;
    };

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!(
                "{} could not read '{}': {e}",
                "error:".red().bold(),
                path.display().yellow()
            );
            process::exit(1);
        }
    };

    if !run_source(&mut session, &source, &path.display().to_string()) {
        process::exit(1);
    }
}

/// Runs every line, stopping at the first error. Returns whether all ran.
fn run_source(session: &mut Session, source: &str, origin: &str) -> bool {
    for (index, line) in source.lines().enumerate() {
        match session.run_line(line) {
            Ok(Some(output)) => println!("{output}"),
            Ok(None) => {}
            Err(err) => {
                eprintln!(
                    "{} {}:{}: {err}",
                    "error".red().bold(),
                    origin.cyan(),
                    index + 1
                );
                return false;
            }
        }
    }
    true
}
