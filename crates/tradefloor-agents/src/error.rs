use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Instruction parse error: {0}")]
    Parse(String),

    #[error("Decision engine timed out after {0} seconds")]
    Timeout(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
