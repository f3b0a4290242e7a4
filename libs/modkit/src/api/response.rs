use serde::Serialize;

/// Body returned by operations that only report an outcome, e.g. deletes.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
