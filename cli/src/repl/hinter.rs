use crate::script;

pub fn hint_for(line: &str, pos: usize) -> Option<String> {
    if pos < line.len() {
        return None;
    }

    let trimmed = line.trim_start();
    let command = trimmed.strip_suffix(' ')?;
    if command.contains(char::is_whitespace) {
        return None;
    }

    let usage = script::usage(command)?;
    let args = usage.strip_prefix(command)?.trim_start();
    (!args.is_empty()).then(|| args.to_string())
}
