use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    Synchronous,
    #[default]
    Microtask,
    Tokio,
}

impl FromStr for DispatchKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synchronous" | "sync" => Ok(DispatchKind::Synchronous),
            "microtask" | "queue" => Ok(DispatchKind::Microtask),
            "tokio" => Ok(DispatchKind::Tokio),
            other => Err(ConfigError::UnknownDispatch(other.to_string())),
        }
    }
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DispatchKind::Synchronous => "synchronous",
            DispatchKind::Microtask => "microtask",
            DispatchKind::Tokio => "tokio",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub dispatch: DispatchKind,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dispatch(mut self, dispatch: DispatchKind) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dispatch_aliases() {
        assert_eq!("sync".parse::<DispatchKind>().ok(), Some(DispatchKind::Synchronous));
        assert_eq!(" Microtask ".parse::<DispatchKind>().ok(), Some(DispatchKind::Microtask));
        assert!(matches!(
            "threads".parse::<DispatchKind>(),
            Err(ConfigError::UnknownDispatch(name)) if name == "threads"
        ));
    }

    #[test]
    fn json_config_defaults_missing_fields() {
        let config = EngineConfig::from_json("{}").expect("empty config should parse");
        assert_eq!(config.dispatch, DispatchKind::Microtask);

        let config = EngineConfig::from_json(r#"{"dispatch":"synchronous"}"#)
            .expect("explicit dispatch should parse");
        assert_eq!(config.dispatch, DispatchKind::Synchronous);

        assert!(EngineConfig::from_json(r#"{"mode":"x"}"#).is_err());
    }
}
