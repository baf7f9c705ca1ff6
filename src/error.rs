use std::process::ExitCode;

/// Errors that cause gt to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    HookConflict(String),

    #[error("{0}")]
    HookCorrupt(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    WithCode { code: u8, message: String },

    #[error("{0}")]
    Other(String),
}

impl ExitError {
    pub const fn new(code: u8, message: String) -> Self {
        Self::WithCode { code, message }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::from(2),
            Self::HookConflict(_) => ExitCode::from(3),
            Self::HookCorrupt(_) => ExitCode::from(4),
            Self::NotFound(_) => ExitCode::from(5),
            Self::WithCode { code, .. } => ExitCode::from(*code),
            Self::Other(_) => ExitCode::from(1),
        }
    }
}

impl From<crate::wisp::HookError> for ExitError {
    fn from(err: crate::wisp::HookError) -> Self {
        use crate::wisp::HookError;
        match err {
            HookError::Conflict { .. } => Self::HookConflict(err.to_string()),
            HookError::Corrupt { .. } | HookError::UnknownType { .. } => {
                Self::HookCorrupt(format!(
                    "{err}\nautomatic resume halted: inspect the hook file and burn or re-sling it"
                ))
            }
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<crate::beads::StoreError> for ExitError {
    fn from(err: crate::beads::StoreError) -> Self {
        match err {
            crate::beads::StoreError::NotFound(id) => Self::NotFound(format!("issue {id}")),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<crate::dispatch::DispatchError> for ExitError {
    fn from(err: crate::dispatch::DispatchError) -> Self {
        use crate::dispatch::DispatchError;
        match err {
            DispatchError::Hook(e) => e.into(),
            DispatchError::Store(e) => e.into(),
            other @ DispatchError::AssignedElsewhere { .. } => Self::Other(other.to_string()),
        }
    }
}
