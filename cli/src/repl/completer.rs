use rustyline::completion::Pair;

use crate::script::{COMMANDS, OPS};

const DOT_COMMANDS: [&str; 5] = [".help", ".names", ".clear", ".load", ".exit"];

pub fn complete_line(line: &str, pos: usize) -> (usize, Vec<Pair>) {
    let safe_pos = pos.min(line.len());
    let prefix = &line[..safe_pos];
    let start = word_start(prefix);
    let needle = &prefix[start..];

    let candidates: Vec<&str> = match prefix[..start].split_whitespace().collect::<Vec<_>>()[..] {
        [] => COMMANDS
            .iter()
            .chain(DOT_COMMANDS.iter())
            .copied()
            .filter(|word| word.starts_with(needle))
            .collect(),
        ["then", _, _] => OPS
            .iter()
            .copied()
            .filter(|op| op.starts_with(needle))
            .collect(),
        _ => Vec::new(),
    };

    (start, pairs(&candidates))
}

fn pairs(values: &[&str]) -> Vec<Pair> {
    values
        .iter()
        .map(|v| Pair {
            display: (*v).to_string(),
            replacement: (*v).to_string(),
        })
        .collect()
}

fn word_start(prefix: &str) -> usize {
    prefix
        .char_indices()
        .rev()
        .find(|(_, ch)| ch.is_whitespace())
        .map_or(0, |(idx, ch)| idx + ch.len_utf8())
}
