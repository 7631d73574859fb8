//! Error type shared by every ChatHub crate.
//!
//! Operations return [`AppError`] through [`crate::result::AppResult`];
//! the HTTP and WebSocket adapters turn its [`ErrorKind`] into a status
//! code or an `error`/`ack` frame.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

type BoxedSource = Box<dyn StdError + Send + Sync>;

/// What went wrong, independent of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Referenced user, chat, message or call does not exist.
    NotFound,
    /// Bearer token missing, malformed, expired, or for an unknown user.
    Authentication,
    /// Actor is not a participant, contact, or party of the call.
    Authorization,
    /// Call is not in a state that allows the requested transition.
    InvalidTransition,
    /// Malformed input.
    Validation,
    /// Storage collaborator failure.
    Storage,
    /// TURN provider failure.
    ExternalService,
    Configuration,
    Serialization,
    Internal,
}

impl ErrorKind {
    /// Code sent to clients in `error` frames and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Authentication => "AUTHENTICATION",
            Self::Authorization => "AUTHORIZATION",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::Validation => "VALIDATION",
            Self::Storage => "STORAGE",
            Self::ExternalService => "EXTERNAL_SERVICE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether the caller caused the failure and can fix it by changing
    /// the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound
                | Self::Authentication
                | Self::Authorization
                | Self::InvalidTransition
                | Self::Validation
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failed operation: kind, client-safe message, optional cause.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    /// Safe to show to the client.
    pub message: String,
    #[source]
    pub source: Option<BoxedSource>,
}

macro_rules! kind_constructors {
    ($($(#[$doc:meta])* $fn_name:ident => $kind:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $fn_name(message: impl Into<String>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        )*
    };
}

impl AppError {
    /// An error without an underlying cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// An error wrapping the library error that caused it.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    kind_constructors! {
        /// `NotFound`
        not_found => NotFound;
        /// `Authentication`
        authentication => Authentication;
        /// `Authorization`
        authorization => Authorization;
        /// `InvalidTransition`
        invalid_transition => InvalidTransition;
        /// `Validation`
        validation => Validation;
        /// `Storage`
        storage => Storage;
        /// `ExternalService`
        external_service => ExternalService;
        /// `Configuration`
        configuration => Configuration;
        /// `Internal`
        internal => Internal;
    }

    /// Whether the storage collaborator failed. Such failures abort the
    /// operation before anything is broadcast.
    pub fn is_storage(&self) -> bool {
        self.kind == ErrorKind::Storage
    }
}

/// Cloning keeps kind and message; the cause is not cloneable and is
/// dropped, so clones are for reporting only.
impl Clone for AppError {
    fn clone(&self) -> Self {
        Self::new(self.kind, self.message.clone())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::Serialization, format!("Invalid JSON: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
