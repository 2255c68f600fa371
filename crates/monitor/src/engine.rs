#![forbid(unsafe_code)]

use crate::classify::{AppFilter, Classification, classify};
use crate::clock::Clock;
use crate::persistence::{AppEvent, EventSink, EventStore, EventWrite};
use crate::reset::ResetReceiver;
use crate::snapshot::{Snapshot, SnapshotSource};
use crate::stores::{LoggedApps, RunningSet};
use config::Config;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct Services {
    pub source: Box<dyn SnapshotSource + Send + Sync>,
    pub filter: Box<dyn AppFilter + Send + Sync>,
    pub sink: Box<dyn EventSink + Send + Sync>,
    pub store: Box<dyn EventStore + Send + Sync>,
    pub clock: Box<dyn Clock + Send + Sync>,
}

pub struct ReloadBundle {
    pub config: Config,
    pub filter: Box<dyn AppFilter + Send + Sync>,
}

pub enum ControlEvent {
    Reload(Box<ReloadBundle>),
    DumpStatus,
    /// Delete the persisted history, then forget the in-memory state.
    ClearHistory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick_id: u64,
    /// Tracked pids that disappeared and got their events closed.
    pub ended: usize,
    pub logged: usize,
    pub excluded: usize,
    pub retried: usize,
    /// The snapshot could not be taken, nothing changed.
    pub skipped: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Open events whose process is still alive.
    pub reopened: usize,
    /// Open events closed because their process is gone.
    pub closed: usize,
}

/// Watches process starts and exits and turns them into usage events.
pub struct Monitor {
    config: Config,
    services: Services,
    logged: LoggedApps,
    running: RunningSet,
    tick_id: u64,
}

impl Monitor {
    /// Create a monitor with empty in-memory state. Nothing is read yet.
    pub fn new(config: Config, services: Services) -> Self {
        Self {
            config,
            services,
            logged: LoggedApps::default(),
            running: RunningSet::default(),
            tick_id: 0,
        }
    }

    /// Match the open events left in the store against the live processes.
    ///
    /// Live ones are adopted into the running set and count as logged, dead
    /// ones are closed right away. A failed read leaves the state untouched.
    pub async fn reconcile(&mut self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let open = match self.services.store.open_events().await {
            Ok(open) => open,
            Err(err) => {
                warn!(%err, "failed to read open events, skipping reconciliation");
                return report;
            }
        };

        let now = self.services.clock.now();
        let mut closed = HashSet::new();
        for event in open {
            if self.services.source.is_alive(event.pid) {
                let name = event.process_name.to_lowercase();
                self.logged.mark(&name);
                self.running.insert(event.pid, &name);
                report.reopened += 1;
            } else if closed.insert(event.pid) {
                // One update closes every open row of the pid.
                self.services.sink.enqueue(EventWrite::Close {
                    pid: event.pid,
                    end_time: now,
                });
                report.closed += 1;
            }
        }

        info!(
            reopened = report.reopened,
            closed = report.closed,
            "startup reconciliation finished"
        );
        report
    }

    /// Execute a single observation cycle.
    pub fn tick(&mut self) -> TickReport {
        self.tick_id = self.tick_id.saturating_add(1);
        let mut report = TickReport {
            tick_id: self.tick_id,
            ..Default::default()
        };

        let snapshot = match self.services.source.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%err, "failed to get processes");
                report.skipped = true;
                return report;
            }
        };

        // Exits first, so a relaunch within the same tick is loggable again.
        let live: HashSet<u32> = snapshot.iter().map(|process| process.pid()).collect();
        report.ended = self.close_ended(&live);
        self.classify_new(&snapshot, &mut report);

        debug!(
            tick_id = report.tick_id,
            ended = report.ended,
            logged = report.logged,
            excluded = report.excluded,
            retried = report.retried,
            running = self.running.len(),
            "tick finished"
        );
        report
    }

    fn close_ended(&mut self, live: &HashSet<u32>) -> usize {
        let ended: Vec<u32> = self.running.pids().filter(|pid| !live.contains(pid)).collect();
        if ended.is_empty() {
            return 0;
        }

        let now = self.services.clock.now();
        for &pid in &ended {
            self.services.sink.enqueue(EventWrite::Close { pid, end_time: now });
            let Some(name) = self.running.remove(pid) else {
                continue;
            };
            trace!(pid, %name, "process exited");
            // The last instance is gone, a restart gets logged again.
            if !self.running.has_name(&name) {
                self.logged.forget(&name);
            }
        }
        ended.len()
    }

    fn classify_new(&mut self, snapshot: &Snapshot, report: &mut TickReport) {
        for process in snapshot {
            let pid = process.pid();
            if self.running.contains(pid) {
                continue;
            }

            let outcome = classify(
                process.as_ref(),
                self.services.filter.as_ref(),
                &self.logged,
            );
            trace!(pid, ?outcome, "process classified");

            match &outcome {
                Classification::Log { name, exe } => {
                    let parent_process_name = process.parent_name().unwrap_or_default();
                    info!(pid, %name, exe = %exe.display(), "application started");
                    self.services.sink.enqueue(EventWrite::Open(AppEvent {
                        process_name: name.clone(),
                        pid,
                        parent_process_name,
                        exe_path: exe.clone(),
                        start_time: self.services.clock.now(),
                        end_time: None,
                    }));
                    self.logged.mark(name);
                    report.logged += 1;
                }
                Classification::Exclude { .. } => report.excluded += 1,
                Classification::Retry { .. } => report.retried += 1,
            }

            // Terminal outcomes are never looked at again while the pid lives.
            if outcome.is_terminal()
                && let Some(name) = outcome.name_key()
            {
                self.running.insert(pid, &name);
            }
        }
    }

    /// Forget which applications were logged and which pids were seen, so
    /// every live process is classified afresh on the next tick.
    pub fn reset(&mut self) {
        let forgotten_names = self.logged.clear();
        let forgotten_pids = self.running.len();
        self.running = RunningSet::default();
        info!(forgotten_names, forgotten_pids, "in-memory state cleared");
    }

    /// Reconcile once, then tick every interval until the token is cancelled.
    pub async fn run_until(
        &mut self,
        cancel: CancellationToken,
        mut reset_rx: ResetReceiver,
        mut control_rx: mpsc::UnboundedReceiver<ControlEvent>,
    ) {
        if self.config.monitor.reconcile_on_start {
            self.reconcile().await;
        }

        let mut ticker = Self::ticker(self.config.monitor.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
                Some(()) = reset_rx.recv() => {
                    info!("reset signal received");
                    self.reset();
                }
                Some(event) = control_rx.recv() => {
                    if self.handle_control(event) {
                        ticker = Self::ticker(self.config.monitor.interval);
                    }
                }
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logged_apps(&self) -> &LoggedApps {
        &self.logged
    }

    pub fn running(&self) -> &RunningSet {
        &self.running
    }

    fn ticker(period: Duration) -> Interval {
        let mut ticker = tokio::time::interval(period.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Returns `true` when the poll interval changed.
    fn handle_control(&mut self, event: ControlEvent) -> bool {
        match event {
            ControlEvent::Reload(bundle) => {
                let interval_changed =
                    bundle.config.monitor.interval != self.config.monitor.interval;
                self.apply_reload(*bundle);
                info!("config reloaded");
                interval_changed
            }
            ControlEvent::DumpStatus => {
                self.dump_status();
                false
            }
            ControlEvent::ClearHistory => {
                self.clear_history();
                false
            }
        }
    }

    fn apply_reload(&mut self, mut bundle: ReloadBundle) {
        if bundle.config.persistence.database != self.config.persistence.database {
            warn!(
                current = ?self.config.persistence.database,
                requested = ?bundle.config.persistence.database,
                "ignoring database change during reload"
            );
            bundle.config.persistence.database = self.config.persistence.database.clone();
        }

        self.config = bundle.config;
        self.services.filter = bundle.filter;
    }

    /// The delete is queued on the writer behind every open it has not
    /// flushed yet, and no tick runs before the state is gone, so a live
    /// process is opened again exactly once.
    pub fn clear_history(&mut self) {
        info!("clearing usage history");
        self.services.sink.enqueue(EventWrite::ClearHistory);
        self.reset();
    }

    fn dump_status(&self) {
        info!(?self.config, "current config");
        info!(
            tick_id = self.tick_id,
            running = self.running.len(),
            logged = self.logged.len(),
            "state summary"
        );
        debug!(names = ?self.logged.names(), "logged applications");
    }
}
