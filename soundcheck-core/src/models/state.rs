use serde::Serialize;

/// Recorder state machine.
///
/// State transitions:
/// ```text
/// idle → recording ⇄ paused
///            ↓          ↓
///         stopped    cancelled
///            ↓          ↓
///          (reset) → idle
/// ```
///
/// `Cancelled` is transient: a cancel reports it to the delegate and then
/// settles in `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
    Paused,
    Stopped,
    Cancelled,
}

impl RecorderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Whether a live stream is held in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    pub fn can_reset(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped | Self::Cancelled)
    }
}
