use serde::{Deserialize, Serialize};

/// Envelope wrapped around every successful JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A success response that carries only a message.
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Body of every failed request. `errors` lists per-row messages when the
/// failure came from bulk validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::account::RegisteredUser;

    #[test]
    fn data_may_be_absent_for_any_payload_type() {
        let body = serde_json::to_string(&ApiResponse::message("Password changed")).unwrap();
        assert!(!body.contains("data"));

        let parsed: ApiResponse<RegisteredUser> = serde_json::from_str(&body).unwrap();
        assert!(parsed.success);
        assert!(parsed.data.is_none());
    }
}
