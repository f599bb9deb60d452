pub mod core;
pub mod engine;

use thiserror::Error;

use crate::engine::Step;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("{0}")]
    Usage(String),
    #[error("cannot resolve revision {spec:?}: {message}")]
    Revision { spec: String, message: String },
    #[error("{step}: `{command}` failed: {status}")]
    StepFailed {
        step: Step,
        command: String,
        status: String,
        code: Option<i32>,
    },
    #[error("{step}: cannot run `{command}`: {source}")]
    Spawn {
        step: Step,
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Message(String),
}

impl CheckError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CheckError::Io { context: context.into(), source }
    }

    /// Process exit code for this error: 2 for usage errors, the failing
    /// command's own code when it has one, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckError::Usage(_) => 2,
            CheckError::StepFailed { code: Some(code), .. } if *code != 0 => (*code).clamp(1, 255),
            _ => 1,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, CheckError::Usage(_))
    }
}

pub type CheckResult<T> = Result<T, CheckError>;

pub use crate::core::{AmbientEnv, Options, ToolchainEnv};
pub use crate::engine::{CheckOutcome, Executor, MockExecutor, SystemExecutor, run};
