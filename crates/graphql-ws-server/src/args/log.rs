use clap::ValueEnum;

/// Crates whose events pass the filter below `trace`.
const TARGETS: [&str; 2] = ["graphql_ws", "graphql_ws_server"];

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum LogLevel {
    /// Completely disables logging
    Off,
    /// Errors from the server and its sessions
    Error,
    /// Warnings and errors from the server and its sessions
    Warn,
    /// Connections opening and closing, on top of warnings and errors
    #[default]
    Info,
    /// Every routed message and operation
    Debug,
    /// Everything, dependencies included
    Trace,
}

impl LogLevel {
    /// `EnvFilter` directives for this level.
    pub(crate) fn directives(self) -> String {
        match self {
            LogLevel::Off | LogLevel::Trace => self.to_string(),
            level => {
                let mut directives = TARGETS.map(|target| format!("{target}={level}")).join(",");
                directives.push_str(",off");
                directives
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum LogStyle {
    /// Colored on a terminal, plain otherwise
    Text,
    /// One JSON object per event
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_target_our_crates() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(
            LogLevel::Info.directives(),
            "graphql_ws=info,graphql_ws_server=info,off"
        );
        assert_eq!(LogLevel::Off.directives(), "off");
        assert_eq!(LogLevel::Trace.directives(), "trace");
    }

    #[test]
    fn names_match_the_command_line() {
        assert_eq!(LogLevel::from_str("warn", true), Ok(LogLevel::Warn));
        assert_eq!(LogStyle::Json.to_string(), "json");
    }
}
