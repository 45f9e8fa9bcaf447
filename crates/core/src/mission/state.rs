//! Motion State Types
//!
//! Run state shared by the motion drivers.

/// Driver run state
///
/// Both drivers follow **Idle → Running → Idle**. A tick delivered while
/// Idle is a no-op, which is what makes stopping safe at any point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MotionState {
    /// Not stepping
    #[default]
    Idle,
    /// Stepping on every tick
    Running,
}

impl MotionState {
    pub fn is_running(&self) -> bool {
        matches!(self, MotionState::Running)
    }
}
