use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardrailError {
    #[error("schema error in {file}: {message}")]
    Schema { file: String, message: String },

    #[error("parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("rule not found: {0}")]
    RuleNotFound(String),

    #[error("unknown practice: {0}")]
    UnknownPractice(String),

    #[error("unsupported scanner tool: {0}")]
    UnsupportedTool(String),

    #[error("scanner '{tool}' timed out after {seconds}s")]
    ScanTimeout { tool: String, seconds: u64 },

    #[error("no applicable rules for topic '{topic}' and language '{language}'")]
    InsufficientRules { topic: String, language: String },

    #[error("no rule cards loaded from the given paths")]
    NoRulesLoaded,

    #[error("invalid severity '{0}': expected critical|high|medium|low")]
    InvalidSeverity(String),

    #[error("invalid phase '{0}': expected planning|implementation")]
    InvalidPhase(String),

    #[error("scanner spawn failed: {0}")]
    ScannerSpawnFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GuardrailError>;
