use std::collections::{BTreeMap, HashMap};

use pledge::errors::ConfigError;
use pledge::{Deferred, DispatchKind, Engine, EngineConfig, Failure, Outcome, Promise};
use serde_json::{Number, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("unknown command '{0}' (try .help)")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid JSON value: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("no promise named '{0}'")]
    UnknownPromise(String),

    #[error("'{0}' was not created with defer and cannot be settled")]
    NotADeferred(String),

    #[error("'{0}' is already defined")]
    AlreadyDefined(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Add(Number),
    Concat(String),
    Fail(String),
    Adopt(String),
    Identity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Defer(String),
    Resolve(String, Value),
    Reject(String, String),
    Then { name: String, from: String, op: Op },
    Catch { name: String, from: String, recover: Option<Value> },
    Pass { name: String, from: String },
    All { name: String, inputs: Vec<String> },
    Inspect(Option<String>),
    Run,
    Stats,
}

pub const COMMANDS: [&str; 10] = [
    "defer", "resolve", "reject", "then", "catch", "pass", "all", "inspect", "run", "stats",
];

pub const OPS: [&str; 5] = ["add", "concat", "fail", "adopt", "identity"];

pub fn usage(command: &str) -> Option<&'static str> {
    Some(match command {
        "defer" => "defer NAME",
        "resolve" => "resolve NAME JSON",
        "reject" => "reject NAME MESSAGE",
        "then" => "then NEW FROM (add N | concat TEXT | fail MESSAGE | adopt NAME | identity)",
        "catch" => "catch NEW FROM [JSON]",
        "pass" => "pass NEW FROM",
        "all" => "all NEW NAME...",
        "inspect" => "inspect [NAME]",
        "run" => "run",
        "stats" => "stats",
        _ => return None,
    })
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(idx) => (&input[..idx], input[idx..].trim_start()),
        None => (input, ""),
    }
}

fn word<'a>(rest: &mut &'a str, command: &'static str) -> Result<&'a str, ScriptError> {
    let (head, tail) = split_word(rest);
    if head.is_empty() {
        return Err(ScriptError::Usage(usage(command).unwrap_or(command)));
    }
    *rest = tail;
    Ok(head)
}

fn remainder<'a>(rest: &'a str, command: &'static str) -> Result<&'a str, ScriptError> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(ScriptError::Usage(usage(command).unwrap_or(command)));
    }
    Ok(rest)
}

/// Parses one script line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, ScriptError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (head, mut rest) = split_word(line);
    let command = match head {
        "defer" => Command::Defer(word(&mut rest, "defer")?.to_string()),
        "resolve" => {
            let name = word(&mut rest, "resolve")?.to_string();
            let value = serde_json::from_str(remainder(rest, "resolve")?)?;
            Command::Resolve(name, value)
        }
        "reject" => {
            let name = word(&mut rest, "reject")?.to_string();
            Command::Reject(name, remainder(rest, "reject")?.to_string())
        }
        "then" => {
            let name = word(&mut rest, "then")?.to_string();
            let from = word(&mut rest, "then")?.to_string();
            let op = parse_op(rest)?;
            Command::Then { name, from, op }
        }
        "catch" => {
            let name = word(&mut rest, "catch")?.to_string();
            let from = word(&mut rest, "catch")?.to_string();
            let recover = if rest.trim().is_empty() {
                None
            } else {
                Some(serde_json::from_str(rest.trim())?)
            };
            Command::Catch {
                name,
                from,
                recover,
            }
        }
        "pass" => {
            let name = word(&mut rest, "pass")?.to_string();
            let from = word(&mut rest, "pass")?.to_string();
            Command::Pass { name, from }
        }
        "all" => {
            let name = word(&mut rest, "all")?.to_string();
            let inputs: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            if inputs.is_empty() {
                return Err(ScriptError::Usage(usage("all").unwrap_or("all")));
            }
            Command::All { name, inputs }
        }
        "inspect" => {
            let (name, _) = split_word(rest);
            Command::Inspect((!name.is_empty()).then(|| name.to_string()))
        }
        "run" => Command::Run,
        "stats" => Command::Stats,
        other => return Err(ScriptError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_op(input: &str) -> Result<Op, ScriptError> {
    let (head, rest) = split_word(input);
    let op = match head {
        "add" => {
            let arg = remainder(rest, "then")?;
            let number = serde_json::from_str::<Number>(arg)
                .map_err(|_| ScriptError::InvalidNumber(arg.to_string()))?;
            Op::Add(number)
        }
        "concat" => Op::Concat(remainder(rest, "then")?.to_string()),
        "fail" => Op::Fail(remainder(rest, "then")?.to_string()),
        "adopt" => Op::Adopt(split_word(remainder(rest, "then")?).0.to_string()),
        "identity" => Op::Identity,
        _ => return Err(ScriptError::Usage(usage("then").unwrap_or("then"))),
    };
    Ok(op)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn add(value: &Value, by: &Number) -> Result<Value, Failure> {
    let Value::Number(current) = value else {
        return Err(Failure::type_mismatch("a number", describe(value)));
    };
    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64())
        && let Some(sum) = a.checked_add(b)
    {
        return Ok(Value::from(sum));
    }
    let sum = current.as_f64().unwrap_or(f64::NAN) + by.as_f64().unwrap_or(f64::NAN);
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| Failure::new(format!("{current} + {by} is not a finite number")))
}

enum Step {
    Add(Number),
    Concat(String),
    Fail(String),
    Adopt(Promise<Value>),
    Identity,
}

impl Step {
    fn apply(self, value: Value) -> Result<Outcome<Value>, Failure> {
        match self {
            Step::Add(by) => add(&value, &by).map(Outcome::Value),
            Step::Concat(suffix) => match value {
                Value::String(text) => Ok(Outcome::Value(Value::String(text + &suffix))),
                other => Err(Failure::type_mismatch("a string", describe(&other))),
            },
            Step::Fail(message) => Err(Failure::new(message)),
            Step::Adopt(promise) => Ok(Outcome::from(promise)),
            Step::Identity => Ok(Outcome::Value(value)),
        }
    }
}

/// Named promises over JSON values, driven one command at a time.
pub struct Session {
    engine: Engine,
    deferreds: HashMap<String, Deferred<Value>>,
    promises: BTreeMap<String, Promise<Value>>,
}

impl Session {
    pub fn new(dispatch: DispatchKind) -> Result<Self, ScriptError> {
        let engine = Engine::from_config(&EngineConfig::new().with_dispatch(dispatch))?;
        Ok(Self {
            engine,
            deferreds: HashMap::new(),
            promises: BTreeMap::new(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.promises.keys().map(String::as_str)
    }

    fn promise(&self, name: &str) -> Result<&Promise<Value>, ScriptError> {
        self.promises
            .get(name)
            .ok_or_else(|| ScriptError::UnknownPromise(name.to_string()))
    }

    fn deferred(&self, name: &str) -> Result<&Deferred<Value>, ScriptError> {
        if !self.promises.contains_key(name) {
            return Err(ScriptError::UnknownPromise(name.to_string()));
        }
        self.deferreds
            .get(name)
            .ok_or_else(|| ScriptError::NotADeferred(name.to_string()))
    }

    fn define(&mut self, name: String, promise: Promise<Value>) -> Result<String, ScriptError> {
        if self.promises.contains_key(&name) {
            return Err(ScriptError::AlreadyDefined(name));
        }
        let message = format!("{name} {}", promise.id());
        self.promises.insert(name, promise);
        Ok(message)
    }

    fn settled_message(name: &str, accepted: bool) -> String {
        if accepted {
            format!("{name} settled")
        } else {
            format!("{name} was already settled; ignored")
        }
    }

    fn render(name: &str, promise: &Promise<Value>) -> Result<String, ScriptError> {
        Ok(format!("{name} {}", serde_json::to_string(&promise.inspect())?))
    }

    /// Runs one command and returns the line to show for it.
    pub fn execute(&mut self, command: Command) -> Result<String, ScriptError> {
        match command {
            Command::Defer(name) => {
                let deferred = self.engine.defer::<Value>();
                let message = self.define(name.clone(), deferred.promise())?;
                self.deferreds.insert(name, deferred);
                Ok(message)
            }
            Command::Resolve(name, value) => {
                let accepted = self.deferred(&name)?.resolve(value);
                Ok(Self::settled_message(&name, accepted))
            }
            Command::Reject(name, message) => {
                let accepted = self.deferred(&name)?.reject(message);
                Ok(Self::settled_message(&name, accepted))
            }
            Command::Then { name, from, op } => {
                let step = match op {
                    Op::Add(by) => Step::Add(by),
                    Op::Concat(suffix) => Step::Concat(suffix),
                    Op::Fail(message) => Step::Fail(message),
                    Op::Adopt(other) => Step::Adopt(self.promise(&other)?.clone()),
                    Op::Identity => Step::Identity,
                };
                let promise = self.promise(&from)?.and_then(move |value| step.apply(value));
                self.define(name, promise)
            }
            Command::Catch {
                name,
                from,
                recover,
            } => {
                let promise = self.promise(&from)?.otherwise(move |failure| {
                    Ok(recover.unwrap_or_else(|| Value::String(failure.message().to_string())))
                });
                self.define(name, promise)
            }
            Command::Pass { name, from } => {
                let promise = self.promise(&from)?.then_with(None, None);
                self.define(name, promise)
            }
            Command::All { name, inputs } => {
                let promises = inputs
                    .iter()
                    .map(|input| self.promise(input).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                let all = self.engine.all(promises).then(|values| Ok(Value::Array(values)));
                self.define(name, all)
            }
            Command::Inspect(Some(name)) => Self::render(&name, self.promise(&name)?),
            Command::Inspect(None) => {
                let lines = self
                    .promises
                    .iter()
                    .map(|(name, promise)| Self::render(name, promise))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(lines.join("\n"))
            }
            Command::Run => {
                let ran = self.engine.run_microtasks();
                Ok(format!("ran {ran} job(s)"))
            }
            Command::Stats => Ok(serde_json::to_string(&self.engine.stats())?),
        }
    }

    pub fn run_line(&mut self, line: &str) -> Result<Option<String>, ScriptError> {
        match parse(line)? {
            Some(command) => {
                tracing::debug!(?command, "running command");
                self.execute(command).map(Some)
            }
            None => Ok(None),
        }
    }
}
