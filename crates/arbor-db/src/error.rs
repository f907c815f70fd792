use thiserror::Error;

/// Database layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    PoolError(#[from] diesel_async::pooled_connection::bb8::RunError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    CoreError(#[from] arbor_core::error::CoreError),
}

/// Tree shape violations reported by the tree store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("parent not found")]
    MissingParent,

    #[error("cannot nest a resource under itself or its own descendant")]
    CyclicPath,

    #[error("position must be between 1 and {max}")]
    OutOfBoundary { max: i32 },

    #[error("resource {0} not found")]
    NodeNotFound(i32),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
