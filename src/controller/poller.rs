use super::guard::ReconfigureGuard;
use crate::event::{BarEvent, QueryResult};
use crate::modules::logging::{log_debug, log_warn};
use crate::sources::workspace::{
    QueryOutcome, collect_query, spawn_query, terminate_query, workspace_label,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

/// The task owning the child both reaps and kills it, so a signal can never
/// reach a pid that was already reaped. Dropping `cancel` stops the query.
struct InFlight {
    generation: u64,
    cancel: oneshot::Sender<()>,
}

/// Runs the workspace command, at most one process at a time.
///
/// Every start and every cancel bumps the generation; a result is published
/// only if its generation is still current when it reaches the controller.
pub struct WorkspacePoller {
    command: Vec<String>,
    prefix: String,
    placeholder: String,
    generation: Arc<AtomicU64>,
    in_flight: Option<InFlight>,
}

impl WorkspacePoller {
    pub fn new(command: Vec<String>, prefix: &str, placeholder: &str) -> Self {
        Self {
            command,
            prefix: prefix.to_string(),
            placeholder: placeholder.to_string(),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a query unless one is outstanding. The result arrives on `tx`
    /// as [`BarEvent::WorkspaceFinished`]. Returns whether a query started.
    pub fn query(&mut self, tx: &UnboundedSender<BarEvent>) -> bool {
        if self.in_flight.is_some() {
            return false;
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let mut child = match spawn_query(&self.command) {
            Ok(child) => child,
            Err(e) => {
                log_warn("POLL", &format!("Workspace command failed to start: {}", e));
                let _ = tx.send(BarEvent::WorkspaceFinished(QueryResult {
                    generation,
                    text: self.placeholder.clone(),
                    ok: false,
                }));
                return true;
            }
        };

        let (cancel, cancelled) = oneshot::channel();
        let current = self.generation.clone();
        let prefix = self.prefix.clone();
        let placeholder = self.placeholder.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancelled => {
                    terminate_query(&mut child).await;
                    return;
                }
                outcome = collect_query(&mut child) => outcome,
            };
            if current.load(Ordering::Acquire) != generation {
                return;
            }
            if let QueryOutcome::Failed(reason) = &outcome {
                log_debug("POLL", &format!("Workspace query failed: {}", reason));
            }
            let _ = tx.send(BarEvent::WorkspaceFinished(QueryResult {
                generation,
                text: workspace_label(&outcome, &prefix, &placeholder),
                ok: outcome.is_ok(),
            }));
        });

        self.in_flight = Some(InFlight { generation, cancel });
        true
    }

    /// Terminates the outstanding process and invalidates its result.
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);

        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        // Err: the task already finished and reaped the child.
        let _ = in_flight.cancel.send(());
        log_debug(
            "POLL",
            &format!("Cancelled workspace query gen {}", in_flight.generation),
        );
    }

    /// Accepts a finished query. Returns the label to publish, or `None` if
    /// the result is stale or a reconfiguration is in progress.
    pub fn complete(&mut self, result: QueryResult, guard: &ReconfigureGuard) -> Option<String> {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == result.generation)
        {
            self.in_flight = None;
        }

        if result.generation != self.generation() || guard.is_reconfiguring() {
            log_debug(
                "POLL",
                &format!("Discarding workspace result gen {}", result.generation),
            );
            return None;
        }
        Some(result.text)
    }
}

impl Drop for WorkspacePoller {
    fn drop(&mut self) {
        self.cancel();
    }
}
