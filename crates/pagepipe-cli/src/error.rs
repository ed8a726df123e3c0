//! Error types for the command-line front end.

/// Errors raised while interpreting user input.
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Invalid sort spec {0:?}: expected COLUMN[:asc|desc]")]
    InvalidSort(String),

    #[error("Invalid parameter {0:?}: expected KEY=VALUE")]
    InvalidParam(String),

    #[error("Invalid page number {0:?}")]
    InvalidPage(String),

    #[error("Unknown command '/{0}'. Type /help for commands.")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error(transparent)]
    Pipe(#[from] pagepipe::PipeError),
}

pub type CliResult<T> = Result<T, CliError>;
