use crate::TodoId;
use thiserror::Error;

/// 入力値の不変条件違反
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("title should not be null")]
    EmptyTitle,

    #[error("title is too long: {0} characters")]
    TitleTooLong(usize),
}

#[derive(Debug, Clone, Error)]
pub enum TodoError {
    #[error("Todo not found: {0}")]
    NotFound(TodoId),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type TodoResult<T> = Result<T, TodoError>;
