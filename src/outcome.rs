use serde::{Deserialize, Serialize};

/// Uniform result of every session and store operation.
///
/// Operations never surface a Rust error to the view layer; they resolve to
/// `{ success, error?, data? }` and the caller decides how to present it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult<T = ()> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn done() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_serializes_without_data() {
        let r: ActionResult = ActionResult::failed("Login failed");
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            serde_json::json!({"success": false, "error": "Login failed"})
        );
    }

    #[test]
    fn success_round_trips_into_result() {
        let r = ActionResult::ok(3);
        assert_eq!(r.into_result(), Ok(Some(3)));
        let r: ActionResult<u8> = ActionResult::failed("nope");
        assert_eq!(r.into_result(), Err("nope".to_string()));
    }
}
