use thiserror::Error;

/// Failures surfaced by the request client.
///
/// `Transport` means no usable response reached us; `Backend` carries the
/// service's own status and message, shown to the user verbatim; and
/// `AuthTerminal` is an authorization failure that survived the single
/// refresh-and-retry, at which point the stored credentials have already
/// been wiped and the user has to log in again.
#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{status} - {message}")]
    Backend { status: u16, message: String },
    #[error("session expired ({status} - {message}), please log in again")]
    AuthTerminal { status: u16, message: String },
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("credential storage error")]
    Storage(#[from] std::io::Error),
}

impl Error {
    /// Backend status code, when a response was received at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } | Self::AuthTerminal { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_auth_terminal(&self) -> bool {
        matches!(self, Self::AuthTerminal { .. })
    }
}
