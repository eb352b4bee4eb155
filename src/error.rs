//! Unified error types for the connectivity core.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the manager's error handling uniform.  All variants are `Copy` so they
//! can be cheaply passed between monitor tasks without allocation.
//!
//! Stream-facade callers never see these types: facade operations report
//! neutral sentinels (0/false) and the error only reaches the log.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level connectivity error
// ---------------------------------------------------------------------------

/// Every fallible operation in the connectivity core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bring-up stage's wall-clock budget elapsed.
    /// The `&'static str` names the stage.
    Timeout(&'static str),
    /// A bounded retry loop hit its consecutive-failure ceiling.
    AttemptsExhausted(&'static str),
    /// No concrete stream object exists for the operation.
    TransportAbsent,
    /// A stream adapter's captured binding no longer matches the live
    /// manager state (link kind changed or a newer connection was made).
    StaleAdapter,
    /// The bound transport is globally disabled (e.g. GSM use switched off).
    TransportDisabled,
    /// Raw socket layer failure.
    Stream(StreamError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(stage) => write!(f, "timeout during {stage}"),
            Self::AttemptsExhausted(stage) => write!(f, "attempts exhausted during {stage}"),
            Self::TransportAbsent => write!(f, "no active transport stream"),
            Self::StaleAdapter => write!(f, "stream adapter is stale"),
            Self::TransportDisabled => write!(f, "transport disabled"),
            Self::Stream(e) => write!(f, "stream: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw stream errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// TCP or modem socket I/O failure.
    Io,
    /// Operation requires an open connection but none is present.
    NotConnected,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "socket I/O error"),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
