//! SessionActor - single owner of the device table and the adapter process
//!
//! Every adapter line, caller command and deadline is handled on this one
//! task, so the table and the correlation registries need no locks. The
//! line loop never waits on a correlation: queries are armed and answered
//! later from `handle_line` or from a deadline branch.

use std::cmp;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, error, info, trace, warn};

use super::commands::SessionCommand;
use super::correlation::{AckQueue, CorrelationRegistry};
use crate::adapter::{Adapter, AdapterProcess};
use crate::classifier::{Classified, LineClassifier};
use crate::config::{BridgeConfig, TimingConfig};
use crate::error::BridgeError;
use crate::events::CecEvent;
use crate::keys::KeyEdgeDetector;
use crate::state::{ActiveSource, DeviceTable, PowerStatus};

/// Upper bound of the respawn backoff
const MAX_RESTART_DELAY_MS: u64 = 10_000;
/// Backoff step per failed attempt
const RESTART_STEP_MS: u64 = 250;
/// How long to wait for an exit code once the output has closed
const EXIT_WAIT: Duration = Duration::from_secs(5);

/// Exit code receiver of a process whose output has closed, with its deadline
type PendingExit = (Instant, oneshot::Receiver<Option<i32>>);

/// Result of the first initialization, reported back to `connect`
pub(crate) type ReadySender = oneshot::Sender<Result<(), BridgeError>>;

pub(crate) struct SessionActor {
    adapter: Arc<dyn Adapter>,
    timing: TimingConfig,
    max_restarts: u32,

    table: DeviceTable,
    classifier: LineClassifier,
    keys: KeyEdgeDetector,
    power: CorrelationRegistry<PowerStatus>,
    active: CorrelationRegistry<ActiveSource>,
    acks: AckQueue,

    process: Option<AdapterProcess>,
    exiting: Option<PendingExit>,
    restart_attempt: u32,
    restart_at: Option<Instant>,
    /// Set once the first process printed the ready marker
    initialized: bool,

    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    events: broadcast::Sender<CecEvent>,
    ready_tx: Option<ReadySender>,
}

impl SessionActor {
    /// Start the actor on an already spawned adapter process
    ///
    /// `table` must have its self key set. The returned receiver yields once
    /// the process is ready or has died trying.
    pub(crate) fn spawn(
        adapter: Arc<dyn Adapter>,
        config: &BridgeConfig,
        table: DeviceTable,
        process: AdapterProcess,
        events: broadcast::Sender<CecEvent>,
    ) -> (
        mpsc::UnboundedSender<SessionCommand>,
        oneshot::Receiver<Result<(), BridgeError>>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let actor = SessionActor {
            adapter,
            timing: config.timing.clone(),
            max_restarts: config.adapter.max_restarts,
            classifier: LineClassifier::new(table.self_address()),
            keys: KeyEdgeDetector::new(config.timing.key_release()),
            table,
            power: CorrelationRegistry::new(),
            active: CorrelationRegistry::new(),
            acks: AckQueue::new(),
            process: Some(process),
            exiting: None,
            restart_attempt: 0,
            restart_at: None,
            initialized: false,
            command_rx: cmd_rx,
            events,
            ready_tx: Some(ready_tx),
        };

        tokio::spawn(actor.run());
        info!("SessionActor spawned");

        (cmd_tx, ready_rx)
    }

    async fn run(mut self) {
        debug!("SessionActor run loop started");

        loop {
            let key_deadline = self.keys.deadline();
            let query_deadline = earliest([
                self.power.next_deadline(),
                self.active.next_deadline(),
                self.acks.next_deadline(),
            ]);
            let restart_at = self.restart_at;

            tokio::select! {
                line = next_line(&mut self.process) => match line {
                    Some(line) => self.handle_line(&line),
                    None => self.output_closed(),
                },

                code = wait_exit(&mut self.exiting), if self.exiting.is_some() => {
                    self.exiting = None;
                    if !self.handle_exit(code) {
                        break;
                    }
                }

                cmd = self.command_rx.recv() => match cmd {
                    Some(SessionCommand::Shutdown) | None => {
                        info!("Session shutting down");
                        if let Some(process) = self.process.as_mut() {
                            let _ = process.send("q");
                            process.kill();
                        }
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd),
                },

                _ = sleep_until(or_far_future(key_deadline)), if key_deadline.is_some() => {
                    if let Some(event) = self.keys.expire(Instant::now()) {
                        self.emit(event);
                    }
                }

                _ = sleep_until(or_far_future(query_deadline)), if query_deadline.is_some() => {
                    self.expire_deadlines(Instant::now());
                }

                _ = sleep_until(or_far_future(restart_at)), if restart_at.is_some() => {
                    if !self.restart().await {
                        break;
                    }
                }
            }
        }

        self.close();
        debug!("SessionActor run loop ended");
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        trace!(?cmd, "Processing command");

        match cmd {
            SessionCommand::Send { line, ack } => {
                let written = self.write(line);
                if let Some(ack) = ack {
                    if written {
                        self.acks
                            .push(Instant::now() + self.timing.ack_timeout(), ack);
                    } else {
                        let _ = ack.send(None);
                    }
                }
            }
            SessionCommand::QueryPower { key, response } => {
                let Some(address) = self.table.get(&key).map(|r| r.logical_address) else {
                    warn!("Power query for unknown device {}", key);
                    let _ = response.send(None);
                    return;
                };
                self.table.set_targeted(&key);
                let deadline = Instant::now() + self.timing.query_timeout();
                if self.power.arm(address, deadline, response) {
                    self.write(format!("pow {}", address));
                } else {
                    debug!("Joined pending power query for {}", key);
                }
            }
            SessionCommand::QueryActive { key, response } => {
                let Some(address) = self.table.get(&key).map(|r| r.logical_address) else {
                    warn!("Active-source query for unknown device {}", key);
                    let _ = response.send(None);
                    return;
                };
                self.table.set_targeted(&key);
                let deadline = Instant::now() + self.timing.query_timeout();
                if self.active.arm(address, deadline, response) {
                    self.write(format!("ad {}", address));
                } else {
                    debug!("Joined pending active-source query for {}", key);
                }
            }
            SessionCommand::Snapshot { response } => {
                let _ = response.send(self.table.clone());
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn handle_line(&mut self, line: &str) {
        trace!("adapter: {}", line);

        // Any output at all acknowledges the commands written before it
        self.acks.resolve_all(Some(true));

        match self.classifier.classify(line) {
            Some(Classified::Ready) => self.handle_ready(),
            Some(Classified::PowerStatus(status)) => {
                match self.table.apply_power_to_targeted(status.clone()) {
                    Some(address) => {
                        debug!("Power status of {} is {}", address.device_key(), status);
                        self.emit(CecEvent::PowerStatus {
                            address,
                            status: Some(status.clone()),
                        });
                        self.power.resolve(address, Some(status));
                    }
                    None => debug!("Power status '{}' for an unknown target dropped", status),
                }
            }
            Some(Classified::ActiveSource(active)) => {
                if let Some(address) = self.table.apply_active_to_self(active) {
                    debug!("Active source flag of {} is {}", address.device_key(), active);
                    self.emit(CecEvent::ActiveSource {
                        address,
                        active: Some(active),
                    });
                    self.active.resolve(address, Some(active));
                }
            }
            Some(Classified::KeyPressed(key)) => {
                for event in self.keys.pressed(key, Instant::now()) {
                    self.emit(event);
                }
            }
            Some(Classified::KeyReleased) => self.keys.released(Instant::now()),
            None => {}
        }
    }

    fn handle_ready(&mut self) {
        self.restart_attempt = 0;
        if self.initialized {
            info!("Adapter ready again after restart");
        } else {
            info!("Adapter ready");
            self.initialized = true;
        }
        if let Some(ready_tx) = self.ready_tx.take() {
            let _ = ready_tx.send(Ok(()));
        }
        self.emit(CecEvent::Ready);
    }

    /// The current process stopped producing output
    ///
    /// Its exit code is collected from a separate branch so the loop keeps
    /// serving commands and deadlines in the meantime.
    fn output_closed(&mut self) {
        if let Some(mut process) = self.process.take() {
            debug!("Adapter output closed, waiting for exit code");
            process.kill();
            self.exiting = Some((Instant::now() + EXIT_WAIT, process.exit));
        }
        self.acks.resolve_all(None);
    }

    /// Current process is gone; returns false when the session must end
    fn handle_exit(&mut self, code: Option<i32>) -> bool {
        if !self.initialized {
            error!("Adapter exited before initialization (code {:?})", code);
            if let Some(ready_tx) = self.ready_tx.take() {
                let _ = ready_tx.send(Err(BridgeError::ExitedBeforeInit(code)));
            }
            return false;
        }

        warn!("Adapter exited unexpectedly (code {:?})", code);
        self.classifier.reset();
        self.schedule_restart()
    }

    fn schedule_restart(&mut self) -> bool {
        self.restart_attempt += 1;
        if self.restart_attempt > self.max_restarts {
            let message = format!(
                "adapter process could not be restarted after {} attempts",
                self.max_restarts
            );
            error!("{}", message);
            self.emit(CecEvent::Error { message });
            return false;
        }

        let delay_ms = cmp::min(
            MAX_RESTART_DELAY_MS,
            RESTART_STEP_MS * u64::from(self.restart_attempt),
        );
        debug!(
            "Adapter restart #{} in {}ms",
            self.restart_attempt, delay_ms
        );
        self.restart_at = Some(Instant::now() + Duration::from_millis(delay_ms));
        true
    }

    async fn restart(&mut self) -> bool {
        self.restart_at = None;
        match self.adapter.spawn().await {
            Ok(process) => {
                info!(
                    "Adapter {} restarted (attempt {})",
                    self.adapter.name(),
                    self.restart_attempt
                );
                self.process = Some(process);
                true
            }
            Err(e) => {
                warn!("Adapter restart #{} failed: {}", self.restart_attempt, e);
                self.schedule_restart()
            }
        }
    }

    fn expire_deadlines(&mut self, now: Instant) {
        for address in self.power.expire(now) {
            debug!("Power query for {} timed out", address.device_key());
            self.table
                .set_power(&address.device_key(), PowerStatus::Unknown);
            self.emit(CecEvent::PowerStatus {
                address,
                status: None,
            });
        }

        for address in self.active.expire(now) {
            debug!("Active-source query for {} timed out", address.device_key());
            self.table
                .set_active(&address.device_key(), ActiveSource::Unknown);
            self.emit(CecEvent::ActiveSource {
                address,
                active: None,
            });
        }

        self.acks.expire(now);
    }

    fn write(&mut self, line: String) -> bool {
        match &self.process {
            Some(process) => {
                debug!("-> {}", line);
                process.send(line)
            }
            None => {
                warn!("Adapter not running, dropping command '{}'", line);
                false
            }
        }
    }

    fn emit(&self, event: CecEvent) {
        trace!("Emitting {}", event.name());
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Answer everything still waiting
    fn close(&mut self) {
        self.power.clear();
        self.active.clear();
        self.acks.resolve_all(None);
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
    }
}

async fn next_line(process: &mut Option<AdapterProcess>) -> Option<String> {
    match process {
        Some(process) => process.lines.recv().await,
        None => std::future::pending().await,
    }
}

/// Exit code of a closed process, `None` if it never reports one in time
async fn wait_exit(exiting: &mut Option<PendingExit>) -> Option<i32> {
    match exiting {
        Some((deadline, exit)) => match timeout_at(*deadline, exit).await {
            Ok(code) => code.ok().flatten(),
            Err(_) => {
                warn!("Adapter did not report an exit code, treating it as gone");
                None
            }
        },
        None => std::future::pending().await,
    }
}

fn earliest<const N: usize>(deadlines: [Option<Instant>; N]) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}

/// Stand-in instant for disabled timer branches
fn or_far_future(deadline: Option<Instant>) -> Instant {
    deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400))
}
