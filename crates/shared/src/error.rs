use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("profile id must not be empty")]
    EmptyProfileId,
}
