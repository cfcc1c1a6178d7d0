use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid project name `{name}`: {reason}")]
    InvalidProjectName { name: String, reason: &'static str },
}

impl DomainError {
    pub fn invalid_project_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidProjectName {
            name: name.into(),
            reason,
        }
    }
}
