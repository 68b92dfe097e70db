//! Shared error type across orbit crates.
//!
//! Every failure, wherever it is raised, is an [`RpcError`]: a stable
//! [`ErrorCode`], a free-text detail, and an optional cause. Errors cross the
//! wire as an `ERROR` record and decode back to an equal value.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::message::{MessageError, Record, Value};

/// Name of the error envelope record.
pub const ERROR_RECORD: &str = "ERROR";

/// Stable failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Bad credentials.
    User,
    /// Protocol version mismatch (strict equality).
    Version,
    NotLoggedIn,
    SessionInvalid,
    /// Shared environment is still loading.
    NotReady,
    NoGameRunning,
    /// A game runs but has no seat for this participant.
    NoGameAvailable,
    /// Decode failure.
    Format,
    UnknownMessage,
    /// Logic thread hand-off failed.
    Interrupted,
    /// Catch-all for uncaught failures.
    ServerBug,
    /// Rejection raised by the game engine, passed through unchanged.
    Game,
    /// Client-local: the transport could not complete the exchange.
    Transport,
    /// Client-local: a batch position the server never reached.
    NotExecuted,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 14] = [
        ErrorCode::User,
        ErrorCode::Version,
        ErrorCode::NotLoggedIn,
        ErrorCode::SessionInvalid,
        ErrorCode::NotReady,
        ErrorCode::NoGameRunning,
        ErrorCode::NoGameAvailable,
        ErrorCode::Format,
        ErrorCode::UnknownMessage,
        ErrorCode::Interrupted,
        ErrorCode::ServerBug,
        ErrorCode::Game,
        ErrorCode::Transport,
        ErrorCode::NotExecuted,
    ];

    /// String representation used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::User => "USER",
            ErrorCode::Version => "VERSION",
            ErrorCode::NotLoggedIn => "NOT_LOGGED_IN",
            ErrorCode::SessionInvalid => "SESSION_INVALID",
            ErrorCode::NotReady => "NOT_READY",
            ErrorCode::NoGameRunning => "NO_GAME_RUNNING",
            ErrorCode::NoGameAvailable => "NO_GAME_AVAILABLE",
            ErrorCode::Format => "FORMAT",
            ErrorCode::UnknownMessage => "UNKNOWN_MESSAGE",
            ErrorCode::Interrupted => "INTERRUPTED",
            ErrorCode::ServerBug => "SERVER_BUG",
            ErrorCode::Game => "GAME",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::NotExecuted => "NOT_EXECUTED",
        }
    }

    /// Codes that only ever exist on the client side of a connection.
    pub fn is_client_local(self) -> bool {
        matches!(self, ErrorCode::Transport | ErrorCode::NotExecuted)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| RpcError::format(format!("unknown error code: {s}")))
    }
}

/// Shared result type.
pub type RpcResult<T> = std::result::Result<T, RpcError>;

/// Unified error value used by the contract on every side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {detail}")]
pub struct RpcError {
    code: ErrorCode,
    detail: String,
    cause: Option<String>,
}

impl RpcError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn user(user: &str) -> Self {
        Self::new(ErrorCode::User, format!("bad credentials for user {user}"))
    }

    /// Both version strings travel in the detail.
    pub fn version(client: &str, server: &str) -> Self {
        Self::new(
            ErrorCode::Version,
            format!("protocol version mismatch: client {client}, server {server}"),
        )
    }

    pub fn not_logged_in() -> Self {
        Self::new(ErrorCode::NotLoggedIn, "not logged in")
    }

    pub fn session_invalid() -> Self {
        Self::new(ErrorCode::SessionInvalid, "session is no longer valid")
    }

    pub fn not_ready() -> Self {
        Self::new(ErrorCode::NotReady, "environment is loading")
    }

    pub fn no_game_running() -> Self {
        Self::new(ErrorCode::NoGameRunning, "no game is running")
    }

    pub fn no_game_available(participant: &str) -> Self {
        Self::new(
            ErrorCode::NoGameAvailable,
            format!("no seat in the running game for {participant}"),
        )
    }

    pub fn format(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Format, detail)
    }

    pub fn unknown_message(name: &str) -> Self {
        Self::new(ErrorCode::UnknownMessage, name)
    }

    pub fn interrupted(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Interrupted, detail)
    }

    pub fn server_bug(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerBug, detail)
    }

    pub fn game(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Game, detail)
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, detail)
    }

    pub fn not_executed() -> Self {
        Self::new(
            ErrorCode::NotExecuted,
            "batch stopped before this call was executed",
        )
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// Encode as an error envelope.
    pub fn to_record(&self) -> Record {
        let record = Record::new(ERROR_RECORD)
            .with("code", Value::Str(self.code.as_str().to_string()))
            .with("detail", Value::Str(self.detail.clone()));
        match &self.cause {
            Some(cause) => record.with("cause", Value::Str(cause.clone())),
            None => record,
        }
    }

    /// Decode an error envelope. A malformed envelope is itself a FORMAT error.
    pub fn from_record(record: &Record) -> Self {
        let decoded = record
            .expect_name(ERROR_RECORD)
            .map_err(RpcError::from)
            .and_then(|()| {
                let code: String = record.get("code")?;
                let code = code.parse::<ErrorCode>()?;
                let detail: String = record.get("detail")?;
                let cause: Option<String> = record.get_opt("cause")?;
                Ok(RpcError {
                    code,
                    detail,
                    cause,
                })
            });
        match decoded {
            Ok(err) | Err(err) => err,
        }
    }
}

impl From<MessageError> for RpcError {
    fn from(err: MessageError) -> Self {
        RpcError::format(err.to_string())
    }
}

/// Batch bracket misuse on a client binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("begin() called while a batch is already open")]
    AlreadyOpen,
    #[error("end() called without an open batch")]
    NotOpen,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_strings() {
        for code in ErrorCode::ALL {
            assert_eq!(code.as_str().parse::<ErrorCode>(), Ok(code));
        }
        let err = "NOPE".parse::<ErrorCode>();
        assert_eq!(err.map_err(|e| e.code()), Err(ErrorCode::Format));
    }

    #[test]
    fn envelope_round_trip_keeps_cause() {
        let err = RpcError::server_bug("fleet table corrupt").with_cause("index out of range");
        let back = RpcError::from_record(&err.to_record());
        assert_eq!(back, err);
        assert_eq!(back.cause(), Some("index out of range"));
    }

    #[test]
    fn version_error_carries_both_versions() {
        let err = RpcError::version("1.3", "1.4");
        assert_eq!(err.code(), ErrorCode::Version);
        assert!(err.detail().contains("1.3"));
        assert!(err.detail().contains("1.4"));
    }

    #[test]
    fn malformed_envelope_is_a_format_error() {
        let record = Record::new(ERROR_RECORD).with("code", Value::Int(4));
        assert_eq!(RpcError::from_record(&record).code(), ErrorCode::Format);

        let record = Record::new("PONG");
        assert_eq!(RpcError::from_record(&record).code(), ErrorCode::Format);
    }
}
