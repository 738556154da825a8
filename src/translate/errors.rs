use crate::jvm;
use std::fmt::{Display, Error as FmtError, Formatter};

#[derive(Debug)]
pub enum Error {
    BytecodeGen(jvm::Error),

    /// A line doesn't have any of the supported shapes
    SyntaxUnrecognized(String),

    /// Variable used before it was assigned
    UnresolvedVariable(String),

    /// Function called before it was defined (or before its definition was closed)
    UnresolvedFunction(String),

    /// Variable holds a string where a number is needed
    NotANumber(String),

    /// Token should be a number literal but isn't one (or doesn't fit in 32 bits)
    InvalidNumber(String),

    /// Division by zero
    ArithmeticFault { lhs: i32, rhs: i32 },

    /// `then` or `else` without an enclosing `if`
    ConditionOutsideIf,

    NestedFunction(String),
    UnmatchedEndFunction,
    IndentedLineOutsideFunction(String),

    /// Input ended while this function was still being defined
    UnterminatedFunction(String),

    /// Too many nested `then`/`else`/`do`/`call` (usually a recursive function)
    NestingTooDeep(usize),

    MalformedName(String),
    IoError(std::io::Error),

    /// Some other error, annotated with the (1-based) line of source it happened on
    AtLine { line_number: usize, error: Box<Error> },
}

impl Error {
    /// Strip away any line number annotations
    pub fn kind(&self) -> &Error {
        match self {
            Error::AtLine { error, .. } => error.kind(),
            other => other,
        }
    }

    /// Line of source the error happened on, if known
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Error::AtLine { line_number, .. } => Some(*line_number),
            _ => None,
        }
    }

    pub(crate) fn at_line(self, line_number: usize) -> Error {
        match self {
            located @ Error::AtLine { .. } => located,
            error => Error::AtLine {
                line_number,
                error: Box::new(error),
            },
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Error::BytecodeGen(err) => write!(f, "bytecode generation failed: {}", err),
            Error::SyntaxUnrecognized(text) => write!(f, "unrecognized line {:?}", text),
            Error::UnresolvedVariable(name) => write!(f, "unknown variable '{}'", name),
            Error::UnresolvedFunction(name) => write!(f, "unknown function '{}'", name),
            Error::NotANumber(name) => write!(f, "variable '{}' is not a number", name),
            Error::InvalidNumber(token) => write!(f, "'{}' is not a valid number", token),
            Error::ArithmeticFault { lhs, rhs } => {
                write!(f, "division by zero ({} / {})", lhs, rhs)
            }
            Error::ConditionOutsideIf => f.write_str("`then`/`else` outside of an `if`"),
            Error::NestedFunction(name) => {
                write!(f, "function '{}' defined inside another function", name)
            }
            Error::UnmatchedEndFunction => f.write_str("`end fn` without a matching `fn`"),
            Error::IndentedLineOutsideFunction(text) => {
                write!(f, "indented line {:?} outside of a function", text)
            }
            Error::UnterminatedFunction(name) => {
                write!(f, "function '{}' is missing `end fn`", name)
            }
            Error::NestingTooDeep(depth) => {
                write!(f, "nesting exceeds {} levels (recursive function?)", depth)
            }
            Error::MalformedName(msg) => f.write_str(msg),
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::AtLine { line_number, error } => write!(f, "line {}: {}", line_number, error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::BytecodeGen(err) => Some(err),
            Error::IoError(err) => Some(err),
            Error::AtLine { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        Error::BytecodeGen(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
