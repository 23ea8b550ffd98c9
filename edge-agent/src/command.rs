//! Command-line grammar
//!
//! Commands arrive as a single string: all whitespace is stripped, then the
//! result is split on `,`. Position 0 is the verb, the rest are positional
//! arguments. There is no escaping; values that could contain commas or
//! whitespace (file contents) travel base64-encoded.
//!
//! Everything downstream works on the typed forms below and never re-parses
//! the raw string.

use crate::error::{AgentError, Result};

/// Verbs accepted by the device-management entry point.
pub const EDGEX_OPERATION: &str = "edgex-operation";
pub const EDGEX_CONFIG: &str = "edgex-config";
pub const EDGEX_METRICS: &str = "edgex-metrics";
pub const EDGEX_PING: &str = "edgex-ping";

/// Sub-commands accepted by the service-configuration entry point.
pub const VIEW: &str = "view";
pub const SAVE: &str = "save";

/// A parsed command line: verb plus positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub verb: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Strip whitespace and split on commas.
    ///
    /// A line that is empty once whitespace is removed is rejected before
    /// anything else happens.
    pub fn parse(line: &str) -> Result<Self> {
        let normalized: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        if normalized.is_empty() {
            return Err(AgentError::InvalidCommand);
        }

        let mut tokens = normalized.split(',').map(str::to_string);
        let verb = tokens.next().unwrap_or_default();
        Ok(Self {
            verb,
            args: tokens.collect(),
        })
    }
}

/// Device-management operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    PushOperation(Vec<String>),
    FetchConfig(Vec<String>),
    FetchMetrics(Vec<String>),
    Ping,
    Unrecognized(String),
}

impl ControlCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let CommandLine { verb, args } = CommandLine::parse(line)?;

        let command = match verb.as_str() {
            EDGEX_OPERATION => ControlCommand::PushOperation(args),
            EDGEX_CONFIG => ControlCommand::FetchConfig(args),
            EDGEX_METRICS => ControlCommand::FetchMetrics(args),
            // ping takes no arguments; any that are supplied are ignored
            EDGEX_PING => return Ok(ControlCommand::Ping),
            _ if args.is_empty() => return Err(AgentError::InvalidCommand),
            _ => return Ok(ControlCommand::Unrecognized(verb)),
        };

        if command.args().is_empty() {
            return Err(AgentError::InvalidCommand);
        }
        Ok(command)
    }

    /// Verb as it appeared on the wire; used as the response record name.
    pub fn verb(&self) -> &str {
        match self {
            ControlCommand::PushOperation(_) => EDGEX_OPERATION,
            ControlCommand::FetchConfig(_) => EDGEX_CONFIG,
            ControlCommand::FetchMetrics(_) => EDGEX_METRICS,
            ControlCommand::Ping => EDGEX_PING,
            ControlCommand::Unrecognized(verb) => verb,
        }
    }

    fn args(&self) -> &[String] {
        match self {
            ControlCommand::PushOperation(args)
            | ControlCommand::FetchConfig(args)
            | ControlCommand::FetchMetrics(args) => args,
            ControlCommand::Ping | ControlCommand::Unrecognized(_) => &[],
        }
    }
}

/// Per-downstream-service configuration sub-commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCommand {
    View,
    Save {
        service: String,
        file: String,
        content: String,
    },
    Unrecognized(String),
}

impl ServiceCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let CommandLine { verb, args } = CommandLine::parse(line)?;

        match verb.as_str() {
            VIEW => Ok(ServiceCommand::View),
            SAVE => {
                let mut args = args.into_iter();
                match (args.next(), args.next(), args.next()) {
                    (Some(service), Some(file), Some(content)) => Ok(ServiceCommand::Save {
                        service,
                        file,
                        content,
                    }),
                    _ => Err(AgentError::InvalidCommand),
                }
            }
            _ => Ok(ServiceCommand::Unrecognized(verb)),
        }
    }

    pub fn verb(&self) -> &str {
        match self {
            ServiceCommand::View => VIEW,
            ServiceCommand::Save { .. } => SAVE,
            ServiceCommand::Unrecognized(verb) => verb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_whitespace() {
        let cmd = CommandLine::parse(" ls , -l,\t/tmp \n").unwrap();
        assert_eq!(cmd.verb, "ls");
        assert_eq!(cmd.args, vec!["-l", "/tmp"]);
    }

    #[test]
    fn test_parse_rejects_blank_lines() {
        for line in ["", " ", "\t\n", "   \r\n "] {
            assert!(matches!(CommandLine::parse(line), Err(AgentError::InvalidCommand)));
        }
    }

    #[test]
    fn test_parse_keeps_empty_tokens() {
        let cmd = CommandLine::parse("echo,,x").unwrap();
        assert_eq!(cmd.args, vec!["", "x"]);
    }

    #[test]
    fn test_control_verbs() {
        assert_eq!(
            ControlCommand::parse("edgex-operation,start,edgex-core-data").unwrap(),
            ControlCommand::PushOperation(vec!["start".into(), "edgex-core-data".into()])
        );
        assert_eq!(
            ControlCommand::parse("edgex-metrics, edgex-core-data").unwrap(),
            ControlCommand::FetchMetrics(vec!["edgex-core-data".into()])
        );
        assert_eq!(ControlCommand::parse("edgex-ping").unwrap(), ControlCommand::Ping);
        assert_eq!(ControlCommand::parse("edgex-ping,extra").unwrap(), ControlCommand::Ping);
    }

    #[test]
    fn test_control_arity() {
        assert!(matches!(
            ControlCommand::parse("edgex-config"),
            Err(AgentError::InvalidCommand)
        ));
        assert!(matches!(
            ControlCommand::parse("edgex-operation"),
            Err(AgentError::InvalidCommand)
        ));
    }

    #[test]
    fn test_control_unrecognized() {
        let cmd = ControlCommand::parse("bogus-verb,x").unwrap();
        assert_eq!(cmd, ControlCommand::Unrecognized("bogus-verb".into()));
        assert_eq!(cmd.verb(), "bogus-verb");

        // too short to be any command, known verb or not
        assert!(matches!(
            ControlCommand::parse("bogus"),
            Err(AgentError::InvalidCommand)
        ));
    }

    #[test]
    fn test_service_commands() {
        assert_eq!(ServiceCommand::parse("view").unwrap(), ServiceCommand::View);
        assert_eq!(
            ServiceCommand::parse("save, export, /configs/export/config.toml, Yg==").unwrap(),
            ServiceCommand::Save {
                service: "export".into(),
                file: "/configs/export/config.toml".into(),
                content: "Yg==".into(),
            }
        );
        assert!(matches!(
            ServiceCommand::parse("save,export,file"),
            Err(AgentError::InvalidCommand)
        ));
        assert_eq!(
            ServiceCommand::parse("restart").unwrap(),
            ServiceCommand::Unrecognized("restart".into())
        );
    }
}
