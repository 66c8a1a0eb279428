use reqwest::{Response, StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{service} rejected the credentials (HTTP {status})")]
    Unauthorized { service: &'static str, status: u16 },

    #[error("{service}: {what} not found")]
    NotFound { service: &'static str, what: String },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SourceError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SourceError::Unauthorized { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}

/// Turn a non-2xx response into the matching `SourceError`
pub(crate) async fn ensure_success(
    service: &'static str,
    what: &str,
    response: Response,
) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::Unauthorized {
            service,
            status: status.as_u16(),
        }),
        StatusCode::NOT_FOUND => Err(SourceError::NotFound {
            service,
            what: what.to_string(),
        }),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(SourceError::Status {
                service,
                status: status.as_u16(),
                body,
            })
        }
    }
}
