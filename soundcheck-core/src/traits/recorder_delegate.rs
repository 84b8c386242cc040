use crate::models::error::CaptureError;
use crate::models::recording::Take;
use crate::models::state::RecorderState;

/// Event delegate for recorder notifications.
///
/// Methods are called from whichever thread drove the change: the caller's
/// thread for explicit operations, the tick thread for elapsed-time updates
/// and auto-stop. The recorder never holds its lock while calling out, so
/// implementations may query the recorder.
pub trait RecorderDelegate: Send + Sync {
    /// Called after every state transition.
    fn on_state_changed(&self, state: RecorderState);

    /// Called on every tick while recording.
    fn on_elapsed(&self, elapsed_secs: u32);

    /// Called when an operation fails.
    fn on_error(&self, error: &CaptureError);

    /// Called when a session is finalized by `stop` or auto-stop.
    fn on_take_finished(&self, take: &Take);
}
