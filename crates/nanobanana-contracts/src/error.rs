use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::providers::ProviderKind;

pub type Result<T> = std::result::Result<T, GenerateError>;

/// Every failure is fatal to the invocation; nothing is retried or downgraded.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{variable} environment variable not set ({hint})")]
    MissingCredential {
        variable: &'static str,
        hint: &'static str,
    },

    #[error("invalid {name}: {value} (valid: {expected})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        expected: String,
    },

    #[error("{context}")]
    LocalIo {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: ProviderKind,
        status: Option<u16>,
        message: String,
    },

    #[error("{provider} API error: {message}{}", .code.map(|code| format!(" (code: {code})")).unwrap_or_default())]
    RemoteApi {
        provider: ProviderKind,
        code: Option<i64>,
        message: String,
    },

    #[error("{provider} returned {reason}")]
    EmptyOutput {
        provider: ProviderKind,
        reason: &'static str,
    },

    #[error("{provider} response malformed: {message}")]
    MalformedResponse {
        provider: ProviderKind,
        message: String,
    },

    #[error("config file {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl GenerateError {
    pub fn local_io(context: impl Into<String>, source: io::Error) -> Self {
        Self::LocalIo {
            context: context.into(),
            source,
        }
    }

    pub fn transport(provider: ProviderKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn malformed(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider,
            message: message.into(),
        }
    }
}
