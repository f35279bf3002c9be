use thiserror::Error;

/// Every failure the CLI can surface. The `Display` text is what reaches the
/// user on stderr, so several variants reproduce exact, stable messages.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Error loading plugin configuration: {0}")]
    PluginConfig(String),

    #[error("Error parsing definition file '{definition}': {reason}")]
    Definition { definition: String, reason: String },
    #[error("Argument --{flag} is missing")]
    MissingArgument { flag: String },
    #[error("Cannot convert '--{flag}' value '{value}' to {expected}")]
    InvalidArgument {
        flag: String,
        value: String,
        expected: String,
    },
    #[error("Unknown argument '--{flag}'")]
    UnknownArgument { flag: String },
    #[error("Unexpected argument '{value}'")]
    UnexpectedArgument { value: String },
    #[error("{}", missing_server_variable_message(.name))]
    MissingServerVariable { name: String },

    #[error("Authentication with '{authenticator}' failed: {reason}")]
    AuthenticationFailed {
        authenticator: String,
        reason: String,
    },

    #[error("{service} returned status code '{status}' and body '{body}'")]
    Upstream {
        service: String,
        status: u16,
        body: String,
    },
    #[error("Error sending request: File '{path}' not found")]
    FileNotFound { path: String },
    #[error("Error sending request: {reason}")]
    Transport { reason: String },
    #[error("Error reading response: {reason}")]
    InvalidResponse { reason: String },
    #[error("Error parsing json response: {reason}")]
    MalformedJson { reason: String },
    #[error("{operation} with operationId '{id}' did not finish in time")]
    Timeout { operation: String, id: String },

    #[error("Unknown command '{group} {name}' for definition '{definition}'")]
    UnknownCommand {
        definition: String,
        group: String,
        name: String,
    },
    #[error("{reason}")]
    CommandNotSupported { reason: String },
    #[error("{}", command_not_found_message(.name, .suggestions))]
    CommandNotFound {
        name: String,
        suggestions: Vec<String>,
    },
}

fn missing_server_variable_message(name: &str) -> String {
    match name {
        "organization" => "Organization is not set".to_string(),
        "tenant" => "Tenant is not set".to_string(),
        other => format!("Server variable '{other}' is not set"),
    }
}

fn command_not_found_message(name: &str, suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return format!("Unknown command '{name}'");
    }
    format!(
        "Unknown command '{name}'\n\nDid you mean:\n  {}",
        suggestions.join("\n  ")
    )
}

impl Error {
    /// Definition parse failure for the named definition.
    pub fn definition(definition: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Definition {
            definition: definition.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    pub fn missing_argument(flag: impl Into<String>) -> Self {
        Self::MissingArgument { flag: flag.into() }
    }

    pub fn transport(reason: impl std::fmt::Display) -> Self {
        Self::Transport {
            reason: reason.to_string(),
        }
    }

    pub fn invalid_response(reason: impl std::fmt::Display) -> Self {
        Self::InvalidResponse {
            reason: reason.to_string(),
        }
    }

    pub fn malformed_json(reason: impl std::fmt::Display) -> Self {
        Self::MalformedJson {
            reason: reason.to_string(),
        }
    }

    pub fn auth_failed(authenticator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            authenticator: authenticator.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => crate::constants::EXIT_CONFIG_ERROR,
            Self::PluginConfig(_) => crate::constants::EXIT_PLUGIN_CONFIG_ERROR,
            _ => 1,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err)
    }
}
