use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

const FLASH_KEY: &str = "_flashes";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    pub fn css_class(&self) -> &'static str {
        match self.level {
            FlashLevel::Success => "flash flash-success",
            FlashLevel::Error => "flash flash-error",
        }
    }
}

/// Session-backed flash queue.
///
/// Messages survive a redirect and are drained by the next page render.
/// Session store failures are logged and never fail the request.
pub struct Flashes {
    session: Session,
}

impl Flashes {
    pub async fn push(&self, level: FlashLevel, text: impl Into<String>) {
        let mut queued: Vec<FlashMessage> = self
            .session
            .get(FLASH_KEY)
            .await
            .unwrap_or(None)
            .unwrap_or_default();
        queued.push(FlashMessage {
            level,
            text: text.into(),
        });

        if let Err(e) = self.session.insert(FLASH_KEY, queued).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    pub async fn error(&self, text: impl Into<String>) {
        self.push(FlashLevel::Error, text).await;
    }

    /// Remove and return every queued message.
    pub async fn take(&self) -> Vec<FlashMessage> {
        match self.session.remove::<Vec<FlashMessage>>(FLASH_KEY).await {
            Ok(messages) => messages.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read flash messages");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Flashes
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to extract session",
                )
                    .into_response()
            })?;

        Ok(Flashes { session })
    }
}
