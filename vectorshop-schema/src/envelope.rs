use serde::{Deserialize, Serialize};

/// Uniform response wrapper: `{"success": bool, "message"?: string, ...payload}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(flatten)]
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            message: None,
            payload,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<Empty> {
    pub fn done() -> Self {
        Self::ok(Empty {})
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            payload: Empty {},
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Count {
    pub count: u64,
}

/// Access token handed back by signup/login. `None` when signup awaits email confirmation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Token {
    pub token: Option<String>,
}
