use super::{BuilderState, ConstantIndex, SymbolKind};
use std::fmt::{Display, Error as FmtError, Formatter};

#[derive(Debug)]
pub enum Error {
    /// Not enough room left in the constants pool (whose indices are `u16`)
    ConstantPoolOverflow { offset: usize, requested: usize },

    /// UTF-8 constant whose encoding is longer than its `u16` length field allows
    ConstantTooLong { length: usize },

    /// A constant refers to an index that was never allocated (indicates a bug)
    MissingConstant(ConstantIndex),

    /// A constant was pushed with `ldc`, but its index does not fit in one byte
    IndexOverflow(ConstantIndex),

    /// Method code would exceed the maximum code length (argument is the attempted length)
    MethodCodeOverflow(usize),

    /// A builder operation was invoked in the wrong state (eg. emitting after finalizing)
    SequencingViolation {
        operation: &'static str,
        state: BuilderState,
    },

    /// Name lookup in one of the builder's symbol tables failed
    UnresolvedSymbol { kind: SymbolKind, name: String },

    MalformedName(String),
    IoError(std::io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Error::ConstantPoolOverflow { offset, requested } => write!(
                f,
                "constant pool overflow: cannot fit {} more constants at #{}",
                requested, offset
            ),
            Error::ConstantTooLong { length } => write!(
                f,
                "UTF-8 constant is {} bytes long (the limit is {})",
                length,
                u16::MAX
            ),
            Error::MissingConstant(index) => {
                write!(f, "constant #{} is referenced but never allocated", index.0)
            }
            Error::IndexOverflow(index) => write!(
                f,
                "constant #{} does not fit in the one-byte operand of `ldc`",
                index.0
            ),
            Error::MethodCodeOverflow(len) => {
                write!(f, "method code too long ({} bytes)", len)
            }
            Error::SequencingViolation { operation, state } => {
                write!(f, "cannot {} when the builder is {:?}", operation, state)
            }
            Error::UnresolvedSymbol { kind, name } => {
                write!(f, "unknown {:?} '{}'", kind, name)
            }
            Error::MalformedName(msg) => f.write_str(msg),
            Error::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
