use thiserror::Error;

/// Why a backend request did not produce the expected payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("could not reach backend: {0}")]
    Transport(String),

    #[error("not authorized{}", suffix(.detail))]
    Unauthorized { detail: Option<String> },

    #[error("backend rejected request ({status}){}", suffix(.detail))]
    Rejected { status: u16, detail: Option<String> },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

fn suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl ApiError {
    /// Builds the error for a non-2xx response, keeping the backend's
    /// human-readable `detail` when the body carries one.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        if status == 401 {
            ApiError::Unauthorized { detail }
        } else {
            ApiError::Rejected { status, detail }
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { detail } | ApiError::Rejected { detail, .. } => {
                detail.as_deref()
            }
            _ => None,
        }
    }

    /// Message to show a user: the backend's detail, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.get("detail")?
        .as_str()
        .filter(|d| !d.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_is_taken_from_json_body() {
        let err = ApiError::from_status(400, r#"{"detail":"Email already registered"}"#);
        assert_eq!(
            err,
            ApiError::Rejected {
                status: 400,
                detail: Some("Email already registered".into())
            }
        );
        assert_eq!(err.user_message("Login failed"), "Email already registered");
    }

    #[test]
    fn non_string_detail_falls_back() {
        // validation errors carry a list of problems instead of a sentence
        let err = ApiError::from_status(422, r#"{"detail":[{"loc":["body"],"msg":"x"}]}"#);
        assert_eq!(err.detail(), None);
        assert_eq!(err.user_message("Failed to save draft"), "Failed to save draft");
    }

    #[test]
    fn status_401_is_unauthorized() {
        let err = ApiError::from_status(401, "not json");
        assert_eq!(err, ApiError::Unauthorized { detail: None });
        assert_eq!(err.to_string(), "not authorized");
    }

    #[test]
    fn transport_errors_use_fallback_message() {
        let err = ApiError::Transport("connection refused".into());
        assert_eq!(err.user_message("Failed to send email"), "Failed to send email");
    }
}
