use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use relay_core::ids::CycleId;
use relay_core::model::{ModelClient, ModelError, StepDecision};
use relay_core::security::BearerToken;
use relay_core::tools::ToolInvocation;
use relay_core::turns::Turn;
use relay_gateway::ToolGateway;
use relay_telemetry::span::TraceBuilder;

use crate::cycle::{CycleReport, StepRecord};

/// Canned reply when the step cap is hit before the model answers.
const STEP_LIMIT_RESPONSE: &str =
    "I wasn't able to finish working on that within the allowed number of steps. \
     Here is where I got to; please try a narrower request.";

/// The bounded THINKING/TOOL_CALL loop.
///
/// Each iteration asks the model for one step. A tool call executes through
/// the gateway and feeds the result (or the failure) back as a tool turn; a
/// text answer ends the cycle. The cap turns runaway loops into degraded
/// success. Only a model failure is fatal here.
pub struct ReasoningLoop {
    model: Arc<dyn ModelClient>,
    gateway: Arc<dyn ToolGateway>,
    max_steps: usize,
}

impl ReasoningLoop {
    pub fn new(
        model: Arc<dyn ModelClient>,
        gateway: Arc<dyn ToolGateway>,
        max_steps: usize,
    ) -> Self {
        Self {
            model,
            gateway,
            max_steps,
        }
    }

    /// Run one cycle. `prior` is the replayed history; the new user turn is
    /// appended here so `new_turns` carries the full persistable sequence.
    ///
    /// Cancellation stops the loop between steps; an in-flight gateway call
    /// runs to completion first.
    pub async fn run(
        &self,
        cycle_id: CycleId,
        prior: Vec<Turn>,
        user_text: &str,
        token: &BearerToken,
        cancel: &CancellationToken,
        trace: &mut TraceBuilder,
    ) -> Result<CycleReport, ModelError> {
        let tools = match self.gateway.list_tools(token).await {
            Ok(tools) => tools,
            Err(e) => {
                // The model can still answer without tools.
                warn!(error = %e, "tool listing failed; continuing without tools");
                trace.set_attribute("tools.unavailable", "true");
                Vec::new()
            }
        };

        let user_turn = Turn::user(user_text);
        let mut history = prior;
        history.push(user_turn.clone());
        let mut new_turns = vec![user_turn];
        let mut steps = Vec::new();

        for index in 0..self.max_steps {
            if cancel.is_cancelled() {
                debug!(cycle_id = %cycle_id, step = index, "cycle cancelled");
                trace.set_attribute("cycle.cancelled", "true");
                return Ok(CycleReport {
                    cycle_id,
                    response: String::new(),
                    new_turns,
                    steps,
                    step_limit_exceeded: false,
                    cancelled: true,
                });
            }

            trace.push("step");
            trace.set_attribute("step.index", index.to_string());
            let step_started = Instant::now();

            let output = match self.model.complete(&history, &tools).await {
                Ok(output) => output,
                Err(e) => {
                    trace.set_attribute("step.error", e.to_string());
                    trace.set_attribute("duration_ms", step_started.elapsed().as_millis().to_string());
                    trace.pop();
                    return Err(e);
                }
            };

            match output.resolve() {
                StepDecision::Answer(text) => {
                    trace.set_attribute("step.outcome", "answer");
                    trace.set_attribute("duration_ms", step_started.elapsed().as_millis().to_string());
                    trace.pop();
                    let turn = Turn::assistant(&text);
                    history.push(turn.clone());
                    new_turns.push(turn);
                    steps.push(StepRecord::answered(index));
                    return Ok(CycleReport {
                        cycle_id,
                        response: text,
                        new_turns,
                        steps,
                        step_limit_exceeded: false,
                        cancelled: false,
                    });
                }
                StepDecision::CallTool(call) => {
                    trace.set_attribute("step.outcome", "tool_call");
                    trace.set_attribute("tool.name", call.name.clone());
                    trace.push(&format!("tool:{}", call.name));

                    let started = Instant::now();
                    let result = self.gateway.invoke(&call, token).await;
                    let duration = started.elapsed();
                    trace.set_attribute("duration_ms", duration.as_millis().to_string());

                    let (turn, invocation) = match result {
                        Ok(value) => {
                            let turn = Turn::tool(value.to_string());
                            let inv = ToolInvocation::succeeded(
                                call.name.clone(),
                                call.parameters,
                                value,
                                duration,
                            );
                            (turn, inv)
                        }
                        Err(err) => {
                            trace.set_attribute("tool.error", err.kind().to_string());
                            // The failure is the tool turn's content; the
                            // model decides whether to retry or work around.
                            let content = json!({
                                "tool": call.name,
                                "error": err.kind(),
                                "message": err.to_string(),
                            })
                            .to_string();
                            let inv = ToolInvocation::failed(
                                call.name.clone(),
                                call.parameters,
                                err.kind(),
                                duration,
                            );
                            (Turn::tool(content), inv)
                        }
                    };

                    trace.pop();
                    trace.set_attribute("duration_ms", step_started.elapsed().as_millis().to_string());
                    trace.pop();
                    history.push(turn.clone());
                    new_turns.push(turn);
                    steps.push(StepRecord::invoked(index, invocation));
                }
            }
        }

        debug!(cycle_id = %cycle_id, max_steps = self.max_steps, "step limit reached");
        trace.set_attribute("cycle.step_limit_exceeded", "true");
        let turn = Turn::assistant(STEP_LIMIT_RESPONSE);
        new_turns.push(turn);
        Ok(CycleReport {
            cycle_id,
            response: STEP_LIMIT_RESPONSE.to_string(),
            new_turns,
            steps,
            step_limit_exceeded: true,
            cancelled: false,
        })
    }
}
