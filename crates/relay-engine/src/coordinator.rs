use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use relay_core::config::TraceVerbosity;
use relay_core::ids::{ActorId, CycleId, SessionId};
use relay_core::model::ModelClient;
use relay_core::security::BearerToken;
use relay_gateway::ToolGateway;
use relay_identity::verifier::Verifier;
use relay_memory::SessionStore;
use relay_telemetry::sink::TraceSink;
use relay_telemetry::span::TraceBuilder;

use crate::error::EngineError;
use crate::runner::ReasoningLoop;

/// Deployment facts stamped onto every cycle's root span.
#[derive(Clone, Debug)]
pub struct CoordinatorSettings {
    pub gateway_url: String,
    pub memory_id: String,
    pub region: String,
    pub max_steps: usize,
    pub trace_verbosity: TraceVerbosity,
}

/// What the server hands back to the caller.
#[derive(Clone, Debug)]
pub struct InvocationOutcome {
    pub response: String,
    pub step_limit_exceeded: bool,
    /// History could not be fully read or written; the response stands but
    /// the stored conversation may have a gap.
    pub persistence_gap: bool,
    pub cancelled: bool,
}

/// Owns one user turn end to end: verify, replay, reason, persist, trace.
pub struct Coordinator {
    verifier: Arc<dyn Verifier>,
    store: Arc<dyn SessionStore>,
    sink: Arc<dyn TraceSink>,
    runner: ReasoningLoop,
    settings: CoordinatorSettings,
    /// Sessions with a cycle in flight. Sessions are logically single-writer;
    /// a second concurrent cycle is rejected, not queued.
    active: DashMap<String, CycleId>,
}

/// Removes the session from the active registry when the cycle ends, on
/// every path out of `handle_message`.
struct ActiveGuard<'a> {
    registry: &'a DashMap<String, CycleId>,
    key: String,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.key);
    }
}

impl Coordinator {
    pub fn new(
        verifier: Arc<dyn Verifier>,
        store: Arc<dyn SessionStore>,
        gateway: Arc<dyn ToolGateway>,
        model: Arc<dyn ModelClient>,
        sink: Arc<dyn TraceSink>,
        settings: CoordinatorSettings,
    ) -> Self {
        let runner = ReasoningLoop::new(model, gateway, settings.max_steps);
        Self {
            verifier,
            store,
            sink,
            runner,
            settings,
            active: DashMap::new(),
        }
    }

    /// Number of cycles currently in flight.
    pub fn active_cycles(&self) -> usize {
        self.active.len()
    }

    #[instrument(skip(self, token, user_text), fields(actor_id = %actor, session_id = %session))]
    pub async fn handle_message(
        &self,
        actor: &ActorId,
        session: &SessionId,
        token: &BearerToken,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<InvocationOutcome, EngineError> {
        if !session.is_well_formed() {
            return Err(EngineError::InvalidSessionId {
                session: session.to_string(),
            });
        }

        // Auth precedes every side effect. A rejected caller never touches
        // the store or the gateway, and no trace is started.
        let identity = self.verifier.verify(token, actor).await?;

        let cycle_id = CycleId::new();
        let _guard = self.register(session, &cycle_id)?;

        let mut trace = TraceBuilder::new("cycle");
        trace.set_attribute("session.id", session.as_str());
        trace.set_attribute("actor.id", actor.as_str());
        trace.set_attribute("gateway.url", &self.settings.gateway_url);
        trace.set_attribute("memory.id", &self.settings.memory_id);
        trace.set_attribute("region", &self.settings.region);
        trace.set_attribute("cycle.id", cycle_id.as_str());
        trace.set_attribute("actor.claim", identity.claim);

        let mut persistence_gap = false;
        let prior = match self.store.get_turns(actor, session).await {
            Ok(turns) => turns,
            Err(e) => {
                // Degrade to an empty history rather than failing the turn.
                warn!(error = %e, "history read failed; starting from empty");
                trace.set_attribute("memory.read_failed", "true");
                persistence_gap = true;
                Vec::new()
            }
        };

        let report = match self
            .runner
            .run(cycle_id, prior, user_text, token, cancel, &mut trace)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                // The tree still closes and ships on the fatal path.
                self.emit(trace).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.append_turns(actor, session, &report.new_turns).await {
            warn!(error = %e, "turn append failed; response stands");
            trace.set_attribute("memory.append_failed", "true");
            persistence_gap = true;
        }

        trace.set_attribute("cycle.steps", report.steps.len().to_string());
        self.emit(trace).await;

        info!(
            cycle_id = %report.cycle_id,
            steps = report.steps.len(),
            step_limit_exceeded = report.step_limit_exceeded,
            persistence_gap,
            "cycle complete"
        );

        Ok(InvocationOutcome {
            response: report.response,
            step_limit_exceeded: report.step_limit_exceeded,
            persistence_gap,
            cancelled: report.cancelled,
        })
    }

    fn register(&self, session: &SessionId, cycle_id: &CycleId) -> Result<ActiveGuard<'_>, EngineError> {
        match self.active.entry(session.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(EngineError::SessionBusy {
                session: session.to_string(),
            }),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(cycle_id.clone());
                Ok(ActiveGuard {
                    registry: &self.active,
                    key: session.to_string(),
                })
            }
        }
    }

    async fn emit(&self, trace: TraceBuilder) {
        let mut span = trace.finish();
        if self.settings.trace_verbosity == TraceVerbosity::Minimal {
            span.children.clear();
        }
        if let Err(e) = self.sink.emit(&span).await {
            // Observability never breaks the primary path.
            warn!(error = %e, "trace emission failed");
        }
    }
}
