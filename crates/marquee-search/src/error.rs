use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RepoError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        Self::backend(format!("mysql: {err}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YearRangeError {
    #[error("Wrong format: {0}")]
    Format(String),
    #[error("Years must be within {min}-{max}")]
    Range { min: i32, max: i32 },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("console i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
