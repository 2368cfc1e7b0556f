use super::HouseError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("House error: {0}")]
    HouseError(#[from] HouseError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
