//! Error management.

use derive_more::Display;
use std::{io, time::Duration};

#[derive(Debug, Display)]
pub enum Err {
    /// A required directory or setting is missing or unusable.
    #[display(fmt = "configuration error: {}", _0)]
    ConfigurationError(String),
    /// Malformed input line, or an edge referencing an unknown vertex.
    #[display(fmt = "parse error: {}: {:?}", context, content)]
    ParseError { context: String, content: String },
    /// The engine process could not be started.
    #[display(fmt = "failed to launch {}: {}", program, source)]
    ProcessLaunchError { program: String, source: io::Error },
    /// The engine process exited unsuccessfully.
    #[display(fmt = "{} completed with a non-zero exit code: {}", program, exit_code)]
    ProcessExecutionError { program: String, exit_code: i32 },
    /// The engine process exceeded the configured timeout and was killed.
    #[display(fmt = "{} did not finish within {:?}", program, timeout)]
    ProcessTimedOut { program: String, timeout: Duration },
    /// The engine result references a vertex without a native id, or is malformed.
    #[display(fmt = "output translation error: {}: {:?}", context, content)]
    OutputTranslationError { context: String, content: String },
    #[display(fmt = "{}", _0)]
    Io(io::Error),
}

impl Err {
    pub(crate) fn parse(context: impl Into<String>, content: impl Into<String>) -> Self {
        Err::ParseError {
            context: context.into(),
            content: content.into(),
        }
    }

    pub(crate) fn output(context: impl Into<String>, content: impl Into<String>) -> Self {
        Err::OutputTranslationError {
            context: context.into(),
            content: content.into(),
        }
    }

    /// The exit code carried by a [`Err::ProcessExecutionError`].
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Err::ProcessExecutionError { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

impl std::error::Error for Err {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Err::ProcessLaunchError { source, .. } => Some(source),
            Err::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Err {
    fn from(e: io::Error) -> Self {
        Err::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Err>;
