//! The controller keeps the bar windows coherent with the display topology
//! and the power state, and feeds them fresh label text once per second.
//!
//! It is a single actor: platform listeners, refresh workers and the signal
//! handler all send [`BarEvent`]s to it, and only the controller task ever
//! touches windows or labels. Work that can block (the workspace command,
//! the battery read) runs elsewhere and comes back as an event tagged with
//! the generation or epoch it was started under.

pub mod guard;
pub mod poller;
pub mod reconciler;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;

use crate::config::BarConfig;
use crate::event::{BarEvent, QueryResult, RefreshKind};
use crate::modules::logging::{log_debug, log_info, log_warn};
use crate::renderer::{Backend, LayoutPolicy};
use crate::sources::{ClockFormatter, PowerSource, battery_label};
use crate::state::Slot;
use anyhow::Result;
use guard::{ReconfigureGuard, ReconfigureTicket};
use poller::WorkspacePoller;
use reconciler::Reconciler;
use scheduler::RefreshScheduler;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, instrument, trace};

pub use guard::Phase;

enum Wakeup {
    Events(Vec<BarEvent>),
    Tick,
}

pub struct Controller<B: Backend> {
    config: Arc<BarConfig>,
    backend: B,
    layout: LayoutPolicy,
    clock: ClockFormatter,
    power: Arc<dyn PowerSource>,
    guard: ReconfigureGuard,
    reconciler: Reconciler,
    scheduler: RefreshScheduler,
    poller: WorkspacePoller,
    /// Held from will-sleep until the wake rebuild finishes.
    sleep_ticket: Option<ReconfigureTicket>,
    events_tx: UnboundedSender<BarEvent>,
    events_rx: UnboundedReceiver<BarEvent>,
    running: bool,
}

impl<B: Backend> Controller<B> {
    pub fn new(config: Arc<BarConfig>, backend: B, power: Arc<dyn PowerSource>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let modules = &config.modules;
        Self {
            layout: LayoutPolicy::from_config(&config),
            clock: ClockFormatter::new(&modules.clock_format, &modules.date_format),
            poller: WorkspacePoller::new(
                modules.workspace_command.clone(),
                &modules.workspace_prefix,
                &modules.workspace_placeholder,
            ),
            reconciler: Reconciler::new(config.window.display_mode()),
            scheduler: RefreshScheduler::default(),
            guard: ReconfigureGuard::new(),
            sleep_ticket: None,
            events_tx,
            events_rx,
            running: false,
            backend,
            power,
            config,
        }
    }

    /// Channel for listeners outside the controller task.
    pub fn sender(&self) -> UnboundedSender<BarEvent> {
        self.events_tx.clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn guard(&self) -> &ReconfigureGuard {
        &self.guard
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn poller(&self) -> &WorkspacePoller {
        &self.poller
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Initial build: the same path as a topology change.
    pub fn start(&mut self) {
        self.running = true;
        log_info("CTRL", "Building bar windows");
        self.on_displays_changed();
        self.backend.present();
    }

    pub async fn run(&mut self) -> Result<()> {
        self.start();
        while self.running {
            self.step().await?;
        }
        log_info("CTRL", "Controller stopped");
        Ok(())
    }

    /// Waits for the next event batch or tick, handles it and presents.
    pub async fn step(&mut self) -> Result<()> {
        let wakeup = tokio::select! {
            biased;
            event = self.events_rx.recv() => {
                Wakeup::Events(vec![event.unwrap_or(BarEvent::Shutdown)])
            }
            batch = self.backend.pump() => Wakeup::Events(batch?),
            _ = self.scheduler.tick() => Wakeup::Tick,
        };

        match wakeup {
            Wakeup::Tick => {
                trace!("tick");
                self.refresh_all();
            }
            Wakeup::Events(mut events) => {
                while let Ok(event) = self.events_rx.try_recv() {
                    events.push(event);
                }
                for event in coalesce(events) {
                    self.handle_event(event);
                }
            }
        }

        self.backend.present();
        Ok(())
    }

    #[instrument(name = "controller::handle_event", skip(self), fields(event = ?event))]
    pub fn handle_event(&mut self, event: BarEvent) {
        match event {
            BarEvent::DisplaysChanged => self.on_displays_changed(),
            BarEvent::WillSleep => self.on_will_sleep(),
            BarEvent::DidWake => self.on_did_wake(),
            BarEvent::WorkspaceFinished(result) => self.apply_workspace(result),
            BarEvent::BatteryRead { epoch, text } => self.apply_battery(epoch, &text),
            BarEvent::Shutdown => self.shutdown(),
        }
    }

    fn on_displays_changed(&mut self) {
        if self.sleep_ticket.is_some() {
            debug!("Display change while asleep, deferring to the wake rebuild");
            return;
        }
        match self.guard.begin_reconfigure() {
            Some(ticket) => self.reconfigure(ticket),
            None => debug!("Reconfiguration already in progress"),
        }
    }

    fn on_will_sleep(&mut self) {
        if self.sleep_ticket.is_some() {
            return;
        }
        let Some(ticket) = self.guard.begin_sleep() else {
            log_warn("SLEEP", "Sleep requested during reconfiguration, ignoring");
            return;
        };
        log_info("SLEEP", "System going to sleep, pausing refresh");
        self.scheduler.stop();
        self.poller.cancel();
        self.sleep_ticket = Some(ticket);
    }

    fn on_did_wake(&mut self) {
        log_info("SLEEP", "System woke up, rebuilding");
        let ticket = match self.sleep_ticket.take() {
            Some(ticket) => ticket.wake(),
            // Wake without a matching sleep: treat it like a topology change.
            None => match self.guard.begin_reconfigure() {
                Some(ticket) => ticket,
                None => return,
            },
        };
        self.reconfigure(ticket);
    }

    /// Stop, terminate, rebuild, restart, release, refresh. Consumes the
    /// ticket so the guard is released before the immediate refresh.
    fn reconfigure(&mut self, ticket: ReconfigureTicket) {
        self.scheduler.stop();
        self.poller.cancel();

        let displays = self.backend.displays();
        self.reconciler.rebuild(
            &ticket,
            &mut self.backend,
            &displays,
            &self.layout,
            self.config.window.height,
        );
        log_info(
            "CTRL",
            &format!(
                "{} window(s) on {} display(s), epoch {}",
                self.reconciler.windows().len(),
                displays.len(),
                self.reconciler.epoch()
            ),
        );

        self.scheduler.start();
        drop(ticket);
        self.refresh_all();
    }

    fn shutdown(&mut self) {
        log_info("CTRL", "Shutting down");
        self.running = false;
        self.scheduler.stop();
        self.poller.cancel();
        self.sleep_ticket = None;
        self.reconciler.retire_all(&mut self.backend);
    }

    pub fn refresh_all(&mut self) {
        self.refresh(RefreshKind::Clock);
        self.refresh(RefreshKind::Workspace);
        self.refresh(RefreshKind::Battery);
    }

    pub fn refresh(&mut self, kind: RefreshKind) {
        if self.guard.is_reconfiguring() || self.reconciler.windows().is_empty() {
            return;
        }
        let config = Arc::clone(&self.config);
        let modules = &config.modules;

        match kind {
            RefreshKind::Clock => {
                let (clock, date) = self.clock.now();
                if modules.show_clock {
                    self.write_all(Slot::Clock, &clock);
                }
                self.write_all(Slot::Date, &date);
            }
            RefreshKind::Workspace => {
                if modules.show_workspace {
                    self.poller.query(&self.events_tx);
                }
            }
            RefreshKind::Battery => {
                if !modules.show_battery {
                    return;
                }
                let epoch = self.reconciler.epoch();
                let power = self.power.clone();
                let tx = self.events_tx.clone();
                tokio::task::spawn_blocking(move || {
                    let text = battery_label(power.read());
                    let _ = tx.send(BarEvent::BatteryRead { epoch, text });
                });
            }
        }
    }

    fn apply_workspace(&mut self, result: QueryResult) {
        if let Some(text) = self.poller.complete(result, &self.guard) {
            self.write_all(Slot::Workspace, &text);
        }
    }

    fn apply_battery(&mut self, epoch: u64, text: &str) {
        if self.guard.is_reconfiguring() || epoch != self.reconciler.epoch() {
            log_debug(
                "CTRL",
                &format!(
                    "Dropping battery read for epoch {} (now {})",
                    epoch,
                    self.reconciler.epoch()
                ),
            );
            return;
        }
        self.write_all(Slot::Battery, text);
    }

    fn write_all(&mut self, slot: Slot, text: &str) {
        for window in self.reconciler.windows() {
            self.backend.write(window.id, slot, text);
        }
    }
}

/// Collapses repeated topology changes within one batch; one rebuild
/// observes the latest topology anyway.
fn coalesce(events: Vec<BarEvent>) -> Vec<BarEvent> {
    let mut seen_display_change = false;
    events
        .into_iter()
        .filter(|event| {
            if *event == BarEvent::DisplaysChanged {
                if seen_display_change {
                    return false;
                }
                seen_display_change = true;
            }
            true
        })
        .collect()
}
