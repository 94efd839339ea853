/// Progress indicator state machine
///
/// Four ordinal steps drive the progress section of the main view. Activating
/// a step marks every lower step completed and the current one active.
/// Percentage and status text are set independently per call and are never
/// derived from the step index.

/// Number of steps shown under the progress bar
pub const STEP_COUNT: usize = 4;

/// Step labels, in activation order
pub const STEP_LABELS: [&str; STEP_COUNT] = ["上传图片", "AI 处理", "生成图片", "完成"];

const IDLE_STATUS: &str = "等待开始...";

/// Visual state of a single step marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMarker {
    Completed,
    Active,
    Pending,
}

/// Presentation state for the progress bar and step markers
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    step: usize,
    pub percent: f32,
    pub status: String,
}

impl Progress {
    /// The idle state shown before and between edit runs
    pub fn idle() -> Self {
        Progress {
            step: 0,
            percent: 0.0,
            status: IDLE_STATUS.to_string(),
        }
    }

    /// Activate a step with an independent status line and percentage
    pub fn set(&mut self, step: usize, status: &str, percent: f32) {
        self.step = step.min(STEP_COUNT - 1);
        self.status = status.to_string();
        self.percent = percent.clamp(0.0, 100.0);
    }

    /// Return to the idle state
    pub fn reset(&mut self) {
        *self = Progress::idle();
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Marker state for the step at `index`
    pub fn marker(&self, index: usize) -> StepMarker {
        if index < self.step {
            StepMarker::Completed
        } else if index == self.step {
            StepMarker::Active
        } else {
            StepMarker::Pending
        }
    }

    /// Whether the bar should render with the pulsing "waiting" style
    pub fn is_waiting(&self) -> bool {
        self.percent == 0.0 && self.status.contains("等待")
    }
}

impl Default for Progress {
    fn default() -> Self {
        Progress::idle()
    }
}
