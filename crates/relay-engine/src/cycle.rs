use relay_core::ids::CycleId;
use relay_core::tools::ToolInvocation;
use relay_core::turns::Turn;

/// One completed reasoning step. At most one tool invocation; a step with
/// none is the step that produced the final answer.
#[derive(Clone, Debug)]
pub struct StepRecord {
    pub index: usize,
    pub invocation: Option<ToolInvocation>,
}

impl StepRecord {
    pub fn answered(index: usize) -> Self {
        Self {
            index,
            invocation: None,
        }
    }

    pub fn invoked(index: usize, invocation: ToolInvocation) -> Self {
        Self {
            index,
            invocation: Some(invocation),
        }
    }
}

/// What one run of the reasoning loop produced.
///
/// `new_turns` is the exact sequence to persist: the user turn first, then
/// every assistant and tool turn in production order.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    pub response: String,
    pub new_turns: Vec<Turn>,
    pub steps: Vec<StepRecord>,
    /// The hard cap was reached before the model answered. Degraded success.
    pub step_limit_exceeded: bool,
    /// The caller went away; the loop stopped before producing an answer.
    pub cancelled: bool,
}

impl CycleReport {
    /// Number of tool invocations that failed across the cycle.
    pub fn failed_invocations(&self) -> usize {
        self.steps
            .iter()
            .filter_map(|s| s.invocation.as_ref())
            .filter(|inv| inv.is_error())
            .count()
    }
}
