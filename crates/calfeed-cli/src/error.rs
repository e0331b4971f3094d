use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] calfeed_core::ConfigError),

    #[error("command error: {0}")]
    Command(String),

    #[error("feed rebuild failed; an empty calendar was written")]
    Degraded,

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Command(_) => 2,
            Self::Degraded => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_usage_code() {
        let error = CliError::from(calfeed_core::ConfigError::InvalidValue {
            name: "PORT",
            expected: "a non-negative integer",
            value: String::from("http"),
        });

        assert_eq!(error.exit_code(), 2);
        assert!(error.to_string().contains("PORT"));
    }

    #[test]
    fn degraded_render_has_its_own_code() {
        assert_eq!(CliError::Degraded.exit_code(), 3);
    }
}
