/// Styling hint for a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmTone {
    Danger,
    Neutral,
}

/// A yes/no question put to the user before a destructive operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub confirm_text: String,
    pub cancel_text: String,
    pub tone: ConfirmTone,
}

impl ConfirmRequest {
    pub fn danger(title: impl Into<String>, message: impl Into<String>, confirm_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            confirm_text: confirm_text.into(),
            cancel_text: "Cancel".into(),
            tone: ConfirmTone::Danger,
        }
    }
}

/// User-facing confirmation capability.
///
/// Returns `true` only on an explicit confirmation; dismissing the prompt
/// returns `false`.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, request: &ConfirmRequest) -> bool;
}

/// Prompt that always answers yes. For headless callers that have
/// already obtained consent.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl ConfirmPrompt for AlwaysConfirm {
    fn confirm(&self, _request: &ConfirmRequest) -> bool {
        true
    }
}
