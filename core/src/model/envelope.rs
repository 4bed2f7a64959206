use crate::prelude::{DashboardError, DashboardResult};
use serde::{Deserialize, Serialize};

/// `{success, data, message}` wrapper used by the `/api/v1` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Unwraps the payload; a successful envelope without `data` yields the empty value.
    pub fn into_data(self) -> DashboardResult<T>
    where
        T: Default,
    {
        if !self.success {
            return Err(DashboardError::Envelope(
                self.message
                    .unwrap_or_else(|| "server reported failure".to_string()),
            ));
        }
        Ok(self.data.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsuccessful_envelope_becomes_error() {
        let envelope: ApiEnvelope<Vec<u32>> =
            serde_json::from_str(r#"{"success": false, "message": "database offline"}"#).unwrap();
        match envelope.into_data() {
            Err(DashboardError::Envelope(message)) => assert_eq!(message, "database offline"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_data_defaults_to_empty() {
        let envelope: ApiEnvelope<Vec<u32>> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(envelope.into_data().unwrap().is_empty());
    }
}
