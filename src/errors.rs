//! Errors surfaced by key lines and their sessions.
//!
//! Every fallible call in the crate returns [`Error`]; match on
//! [`Error::kind`] to tell the recoverable conditions ([`ErrorKind::WouldBlock`],
//! [`ErrorKind::Interrupted`]) apart from fatal ones.

use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IOError;

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Non-blocking read with no pending transition
    WouldBlock,
    /// Blocking call unblocked before a transition arrived
    Interrupted,
    /// The signal source could not be granted or is misconfigured
    Configuration(String),
    Event(nix::Error),
    Io(IOError),
}

impl Error {
    pub(crate) const fn would_block() -> Self {
        Self {
            kind: ErrorKind::WouldBlock,
        }
    }

    pub(crate) const fn interrupted() -> Self {
        Self {
            kind: ErrorKind::Interrupted,
        }
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Configuration(msg.into()),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn is_would_block(&self) -> bool {
        matches!(self.kind, ErrorKind::WouldBlock)
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.kind, ErrorKind::Interrupted)
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, ErrorKind::Configuration(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::WouldBlock => write!(f, "No key transition pending"),
            ErrorKind::Interrupted => write!(f, "Wait for key transition was interrupted"),
            ErrorKind::Configuration(msg) => write!(f, "Key line misconfigured: {}", msg),
            ErrorKind::Event(err) => write!(f, "Failed to read event: {}", err),
            ErrorKind::Io(err) => err.fmt(f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::Event(err) => Some(err),
            ErrorKind::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IOError> for Error {
    fn from(err: IOError) -> Self {
        Self {
            kind: ErrorKind::Io(err),
        }
    }
}

impl From<nix::Error> for Error {
    fn from(err: nix::Error) -> Self {
        Self {
            kind: ErrorKind::Event(err),
        }
    }
}

impl From<Error> for IOError {
    fn from(err: Error) -> Self {
        match err.kind {
            ErrorKind::WouldBlock => IOError::from(std::io::ErrorKind::WouldBlock),
            ErrorKind::Interrupted => IOError::from(std::io::ErrorKind::Interrupted),
            ErrorKind::Configuration(msg) => IOError::new(std::io::ErrorKind::InvalidInput, msg),
            ErrorKind::Event(err) => IOError::from(err),
            ErrorKind::Io(err) => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_io_error_kinds() {
        let io: IOError = Error::would_block().into();
        assert_eq!(io.kind(), std::io::ErrorKind::WouldBlock);

        let io: IOError = Error::interrupted().into();
        assert_eq!(io.kind(), std::io::ErrorKind::Interrupted);

        let io: IOError = Error::configuration("line busy").into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn nix_errors_keep_their_source() {
        let err = Error::from(nix::Error::EBUSY);
        assert!(matches!(err.kind(), ErrorKind::Event(nix::Error::EBUSY)));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Failed to read event"));
    }
}
