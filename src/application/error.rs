use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error("failed to read page `{path}`: {source}")]
    Page {
        path: String,
        source: std::io::Error,
    },
}

impl AppError {
    pub fn page(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Page {
            path: path.into(),
            source,
        }
    }
}
