use crate::script::value::ValueKind;

pub type SplashResult<T> = Result<T, SplashError>;

#[derive(thiserror::Error, Debug)]
pub enum SplashError {
    #[error("arity error: '{command}' expects {expected} argument(s), got {got}")]
    Arity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("type mismatch: {message} (expected {expected})")]
    TypeMismatch { expected: ValueKind, message: String },

    #[error("variable '{0}' not found")]
    VariableNotFound(String),

    #[error("entry '{0}' not found in bundle")]
    EntryNotFound(String),

    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("line {line}: {command}: {source}")]
    Command {
        line: usize,
        command: String,
        #[source]
        source: Box<SplashError>,
    },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("bundle error: {0}")]
    Bundle(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SplashError {
    pub fn arity(command: &'static str, expected: usize, got: usize) -> Self {
        Self::Arity {
            command,
            expected,
            got,
        }
    }

    pub fn type_mismatch(expected: ValueKind, msg: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected,
            message: msg.into(),
        }
    }

    pub fn syntax(line: usize, msg: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }

    pub fn bundle(msg: impl Into<String>) -> Self {
        Self::Bundle(msg.into())
    }

    /// Strip any `Command` wrappers added by the interpreter.
    pub fn root(&self) -> &SplashError {
        match self {
            Self::Command { source, .. } => source.root(),
            other => other,
        }
    }
}
