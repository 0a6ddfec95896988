use std::{error::Error, fmt, io};

use backtrace::Backtrace;

/// Failure categories of the engine. The kind decides how callers react:
/// `TransactionAborted` requires a rollback via
/// `transaction_complete(tx, false)`, `NoSuchElement` is the normal end of
/// an iterator, everything else surfaces to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Db,
    TransactionAborted,
    NoSuchElement,
    Unsupported,
}

#[derive(Debug)]
pub struct TinyError {
    kind: ErrorKind,
    details: String,
}

impl TinyError {
    pub fn new(kind: ErrorKind, msg: &str) -> TinyError {
        TinyError {
            kind,
            details: msg.to_string(),
        }
    }

    pub fn db(msg: &str) -> TinyError {
        Self::new(ErrorKind::Db, msg)
    }

    pub fn io(msg: &str) -> TinyError {
        Self::new(ErrorKind::Io, msg)
    }

    pub fn aborted(msg: &str) -> TinyError {
        Self::new(ErrorKind::TransactionAborted, msg)
    }

    pub fn no_such_element() -> TinyError {
        Self::new(ErrorKind::NoSuchElement, "iterator exhausted")
    }

    pub fn unsupported(msg: &str) -> TinyError {
        Self::new(ErrorKind::Unsupported, msg)
    }

    pub fn get_kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == ErrorKind::TransactionAborted
    }

    pub fn show_backtrace(&self) {
        eprintln!("error: {}\n{:?}", self, Backtrace::new());
    }
}

impl fmt::Display for TinyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.details)
    }
}

impl Error for TinyError {}

impl From<io::Error> for TinyError {
    fn from(e: io::Error) -> Self {
        TinyError::io(&e.to_string())
    }
}
