use reqwest::StatusCode;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Token exchange or workspace resolution failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A catalog request failed or returned something that is not a feature collection.
    #[error("catalog request failed: {0}")]
    Api(String),

    #[error("product {product_id} not found in workspace {workspace_id}")]
    NotFound {
        product_id: String,
        workspace_id: String,
    },

    /// A looked-up feature is missing a field the caller needs.
    #[error("product {product_id}: {detail}")]
    Schema { product_id: String, detail: String },

    #[error("download of {resource_id} failed: {detail}")]
    Transfer { resource_id: String, detail: String },

    #[error("failed to extract {}: {detail}", .archive.display())]
    Archive { archive: PathBuf, detail: String },

    #[error("settings file {}: {detail}", .path.display())]
    Persistence { path: PathBuf, detail: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("host operation failed: {0}")]
    Host(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors that only concern one product; the caller may move on to the next one.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::Schema { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct VendorErrorResponse {
    // Keycloak style: {"error": "...", "error_description": "..."}
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) error_description: Option<String>,
    // Data/search APIs: {"message": "...", "detail": "..."}
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
}

pub(crate) fn format_api_error(status: StatusCode, url: &str, body: &str) -> String {
    let Ok(e) = serde_json::from_str::<VendorErrorResponse>(body) else {
        let body = body.trim();
        if body.is_empty() {
            return format!("HTTP {} for url ({})", status.as_u16(), url);
        }
        return format!("HTTP {} for url ({})\n{}", status.as_u16(), url, body);
    };

    let title = e
        .error
        .as_deref()
        .or(e.message.as_deref())
        .unwrap_or("");
    let detail = e
        .error_description
        .as_deref()
        .or(e.detail.as_deref())
        .unwrap_or("");

    let mut out = format!("HTTP {} for url ({})", status.as_u16(), url);
    if !title.is_empty() {
        out.push('\n');
        out.push_str(title);
    }
    if !detail.is_empty() {
        out.push_str(if title.is_empty() { "\n" } else { ": " });
        out.push_str(detail);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keycloak_error_body_is_readable() {
        let msg = format_api_error(
            StatusCode::UNAUTHORIZED,
            "https://auth/token",
            r#"{"error":"invalid_grant","error_description":"Invalid api key"}"#,
        );
        assert!(msg.contains("HTTP 401"));
        assert!(msg.contains("invalid_grant: Invalid api key"));
    }

    #[test]
    fn non_json_body_is_kept_verbatim() {
        let msg = format_api_error(StatusCode::BAD_GATEWAY, "https://x", "upstream down");
        assert!(msg.ends_with("upstream down"));
    }

    #[test]
    fn only_lookup_errors_are_recoverable() {
        let nf = Error::NotFound {
            product_id: "P1".into(),
            workspace_id: "W".into(),
        };
        assert!(nf.is_recoverable());
        assert!(!Error::Auth("nope".into()).is_recoverable());
    }
}
