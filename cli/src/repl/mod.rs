mod completer;
mod helper;
mod highlighter;
mod hinter;

use std::fs;

use owo_colors::OwoColorize;
use pledge::DispatchKind;
use rustyline::error::ReadlineError;
use rustyline::{Config, EditMode, Editor};

use self::helper::ReplHelper;
use crate::script::{self, Session};

pub fn run(mut session: Session, dispatch: DispatchKind) -> Result<(), ReadlineError> {
    let config = Config::builder()
        .history_ignore_dups(true)?
        .completion_type(rustyline::CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut rl: Editor<ReplHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(ReplHelper));

    println!(
        "{} {} {}",
        "pledge".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black(),
        format!("({dispatch} dispatch)").bright_black()
    );
    println!("{}", "Type .help for commands".bright_black());

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match handle_command(trimmed, &mut session, dispatch) {
                    Some(true) => continue,
                    Some(false) => break,
                    None => run_line(&mut session, trimmed),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "bye".bright_black());
                break;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

/// Handles dot-commands. `Some(false)` means leave the REPL; `None` means
/// the line is a script command.
fn handle_command(trimmed: &str, session: &mut Session, dispatch: DispatchKind) -> Option<bool> {
    if trimmed == ".exit" || trimmed == "exit" {
        return Some(false);
    }
    if trimmed == ".help" {
        for command in script::COMMANDS {
            if let Some(usage) = script::usage(command) {
                println!("{}", usage.bright_blue());
            }
        }
        println!("{}", ".names               list defined promises".bright_blue());
        println!("{}", ".clear               drop every promise".bright_blue());
        println!("{}", ".load <file>         run a script".bright_blue());
        println!("{}", ".exit                exit REPL".bright_blue());
        return Some(true);
    }
    if trimmed == ".names" {
        let names: Vec<_> = session.names().collect();
        println!("{}", names.join(" ").cyan());
        return Some(true);
    }
    if trimmed == ".clear" {
        match Session::new(dispatch) {
            Ok(fresh) => {
                *session = fresh;
                println!("{}", "session cleared".green());
            }
            Err(err) => eprintln!("{} {err}", "error:".red().bold()),
        }
        return Some(true);
    }
    if let Some(path) = trimmed.strip_prefix(".load ") {
        match fs::read_to_string(path.trim()) {
            Ok(source) => {
                for line in source.lines() {
                    run_line(session, line);
                }
            }
            Err(err) => eprintln!("{} {err}", "load error:".red().bold()),
        }
        return Some(true);
    }
    None
}

fn run_line(session: &mut Session, line: &str) {
    match session.run_line(line) {
        Ok(Some(output)) => println!("{}", highlighter::highlight_output(&output)),
        Ok(None) => {}
        Err(err) => eprintln!("{} {err}", "error:".red().bold()),
    }
}
