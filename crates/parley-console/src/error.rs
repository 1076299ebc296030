//! Console driver error types.

use parley_core::error::EngineError;
use thiserror::Error;

/// Startup and runtime errors for the console driver.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The engine rejected a turn.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Reading input or writing output failed.
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_convert_and_keep_message() {
        let err: ConsoleError = EngineError::UnresolvedDialogId("askName".into()).into();

        assert!(matches!(err, ConsoleError::Engine(_)));
        assert!(err.to_string().contains("askName"));
    }

    #[test]
    fn test_io_errors_convert() {
        let err: ConsoleError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin closed").into();

        assert!(matches!(err, ConsoleError::Io(_)));
    }
}
