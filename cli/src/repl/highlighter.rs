use std::borrow::Cow;

use owo_colors::OwoColorize;

use crate::script::{COMMANDS, OPS};

pub fn highlight_line(line: &str) -> Cow<'_, str> {
    let mut words = line.split(' ');
    let Some(first) = words.next() else {
        return Cow::Borrowed(line);
    };
    if !COMMANDS.contains(&first) {
        return Cow::Borrowed(line);
    }

    let mut out = first.blue().bold().to_string();
    for (index, word) in words.enumerate() {
        out.push(' ');
        if first == "then" && index == 2 && OPS.contains(&word) {
            out.push_str(&word.cyan().to_string());
        } else {
            out.push_str(word);
        }
    }
    Cow::Owned(out)
}

pub fn highlight_output(output: &str) -> String {
    output
        .lines()
        .map(|line| {
            if line.contains(r#""state":"rejected""#) {
                line.red().to_string()
            } else if line.contains(r#""state":"fulfilled""#) {
                line.green().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn highlight_prompt(prompt: &str) -> Cow<'_, str> {
    if prompt == "> " {
        return Cow::Owned(format!("{} ", ">".bright_green().bold()));
    }
    Cow::Borrowed(prompt)
}

pub fn highlight_hint(hint: &str) -> Cow<'_, str> {
    Cow::Owned(hint.bright_black().to_string())
}
