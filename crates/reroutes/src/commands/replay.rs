//! `reroutes replay`: drive a script through a full reroute engine backed by
//! an in-memory history, recording the settled state after every step.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use reroutes_core::{
    Action, ActionCreators, HistoryHandle, LocationAction, MemoryHistory, NavigationFailure,
    Reroute, RerouteError, RerouteState, RouterContext, Store,
};

use crate::cli::{GlobalOpts, ReplayArgs};
use crate::config::{self, ReplayScript, Step};
use crate::error::CliError;
use crate::output;

// ── Records ─────────────────────────────────────────────────────────

/// Settled state after one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub op: &'static str,
    pub target: Option<String>,
    pub base: String,
    pub action: Option<LocationAction>,
    pub href: String,
    pub state: Option<Value>,
    pub transitioning: bool,
    pub error: Option<String>,
}

impl StepRecord {
    fn new(step: usize, op: &'static str, target: Option<String>, state: &RerouteState) -> Self {
        Self {
            step,
            op,
            target,
            base: state.base.clone(),
            action: state.action,
            href: state.location.href(),
            state: state.location.state.clone(),
            transitioning: state.transitioning,
            error: None,
        }
    }
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "Op")]
    op: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Base")]
    base: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Location")]
    href: String,
    #[tabled(rename = "Transitioning")]
    transitioning: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl StepRow {
    fn new(record: &StepRecord, color: bool) -> Self {
        Self {
            step: record.step,
            op: record.op.to_owned(),
            target: record.target.clone().unwrap_or_default(),
            base: record.base.clone(),
            action: record.action.map(|a| a.to_string()).unwrap_or_default(),
            href: record.href.clone(),
            transitioning: output::flag(record.transitioning, color),
            error: record
                .error
                .as_deref()
                .map(|e| output::failure(e, color))
                .unwrap_or_default(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ReplayArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let script = config::load_script(&args)?;
    debug!(key = %script.key, steps = script.steps.len(), "loaded replay script");

    let records = replay(&script).await?;
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &records,
        |r| StepRow::new(r, color),
        |r| r.href.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Run `script` to completion. The engine is shut down before returning,
/// whether or not a step failed.
pub async fn replay(script: &ReplayScript) -> Result<Vec<StepRecord>, CliError> {
    let store = Store::new();
    let memory = MemoryHistory::with_entries(&script.initial_entries, script.initial_index);
    let session = Session {
        store: store.clone(),
        reroute: Reroute::new(script.key.clone()),
        history: HistoryHandle::new(memory),
        timeout: Duration::from_millis(script.settle_timeout_ms),
    };

    let result = session.run(script).await;
    store.shutdown().await;
    result
}

// ── Session ─────────────────────────────────────────────────────────

struct Session {
    store: Store,
    reroute: Reroute,
    history: HistoryHandle,
    timeout: Duration,
}

impl Session {
    async fn run(&self, script: &ReplayScript) -> Result<Vec<StepRecord>, CliError> {
        let mut failures = self.store.failures();
        let mut attachment = self.reroute.attachment();
        let mut records = Vec::with_capacity(script.steps.len() + 1);

        attachment.render(&self.store, &self.context(&script.base))?;
        let state = self
            .settle(0, "attach", |s| s.action == Some(LocationAction::Init))
            .await?;
        records.push(StepRecord::new(0, "attach", Some(script.base.clone()), &state));

        for (index, step) in script.steps.iter().enumerate() {
            let number = index + 1;
            let op = step.op();
            info!(step = number, op, "replaying step");

            let record = match step {
                Step::Reroot { base } => {
                    let rooted = attachment.render(&self.store, &self.context(base))?;
                    let state = if rooted {
                        self.settle(number, op, |s| {
                            s.base == *base && s.action == Some(LocationAction::Init)
                        })
                        .await?
                    } else {
                        self.reroute.state(&self.store)
                    };
                    StepRecord::new(number, op, Some(base.clone()), &state)
                }
                intent => {
                    let Some((target, action)) = intent_action(self.reroute.actions(), intent) else {
                        continue;
                    };
                    self.navigate(number, op, target, action, &mut failures)
                        .await?
                }
            };
            records.push(record);
        }

        Ok(records)
    }

    fn context(&self, base: &str) -> RouterContext {
        RouterContext::at(self.history.clone(), base)
    }

    async fn settle(
        &self,
        step: usize,
        op: &'static str,
        predicate: impl FnMut(&RerouteState) -> bool + Send,
    ) -> Result<RerouteState, CliError> {
        tokio::time::timeout(self.timeout, self.reroute.wait_for(&self.store, predicate))
            .await
            .map_err(|_| self.timed_out(step, op))?
            .map_err(CliError::from)
    }

    /// Dispatch an intent, then wait for it to settle or fail.
    async fn navigate(
        &self,
        step: usize,
        op: &'static str,
        target: Option<String>,
        action: Action,
        failures: &mut broadcast::Receiver<Arc<NavigationFailure>>,
    ) -> Result<StepRecord, CliError> {
        self.store.dispatch(action);

        let outcome = tokio::time::timeout(self.timeout, async {
            tokio::select! {
                state = self.reroute.wait_for(&self.store, |s| !s.transitioning) => {
                    state.map(|s| (s, None))
                }
                failure = next_failure(failures) => match failure {
                    Some(failure) => {
                        warn!(step, op, error = %failure.error, "navigation failed");
                        Ok((self.reroute.state(&self.store), Some(failure.error.to_string())))
                    }
                    None => Err(RerouteError::StoreClosed),
                },
            }
        })
        .await
        .map_err(|_| self.timed_out(step, op))?;

        let (state, error) = outcome?;
        let mut record = StepRecord::new(step, op, target, &state);
        record.error = error;
        Ok(record)
    }

    fn timed_out(&self, step: usize, op: &'static str) -> CliError {
        CliError::SettleTimeout {
            step,
            op: op.to_owned(),
            millis: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Next failure, skipping over lag. `None` once the store is gone.
async fn next_failure(
    failures: &mut broadcast::Receiver<Arc<NavigationFailure>>,
) -> Option<Arc<NavigationFailure>> {
    loop {
        match failures.recv().await {
            Ok(failure) => return Some(failure),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "missed navigation failures");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// The intent for a navigation step, plus the target shown in the output.
/// `None` for steps that are not intents.
fn intent_action(actions: &ActionCreators, step: &Step) -> Option<(Option<String>, Action)> {
    let intent = match step {
        Step::Push { path, state } => (
            Some(path.clone()),
            match state {
                Some(state) => actions.push_with_state(path.clone(), state.clone()),
                None => actions.push(path.clone()),
            },
        ),
        Step::Replace { path, state } => (
            Some(path.clone()),
            match state {
                Some(state) => actions.replace_with_state(path.clone(), state.clone()),
                None => actions.replace(path.clone()),
            },
        ),
        Step::Go { delta } => (Some(delta.to_string()), actions.go(*delta)),
        Step::GoBack => (None, actions.go_back()),
        Step::GoForward => (None, actions.go_forward()),
        Step::Reroot { .. } => return None,
    };
    Some(intent)
}
