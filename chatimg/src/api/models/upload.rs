use serde::{Deserialize, Serialize};

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Body of every upload response.
///
/// Success: `{"success": true, "url": "..."}`. Failure: `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn success(url: impl Into<String>) -> Self {
        Self {
            success: true,
            url: Some(url.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            error: Some(error.into()),
        }
    }
}
