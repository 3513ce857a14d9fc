//! Scripted adapter for session tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use cec_bridge::{Adapter, AdapterError, AdapterProcess, BridgeConfig, CecEvent};

/// TV at 0, this adapter ("CEC-Control") at 4
pub const SCAN_OUTPUT: &str = "opening a connection to the CEC adapter...\n\
requesting CEC bus information ...\n\
CEC bus information\n\
===================\n\
device #0: TV\n\
address:       0.0.0.0\n\
active source: no\n\
vendor:        Samsung\n\
osd string:    TV\n\
CEC version:   1.4\n\
power status:  standby\n\
language:      eng\n\
\n\
\n\
device #4: Playback 1\n\
address:       1.0.0.0\n\
active source: no\n\
vendor:        Pulse Eight\n\
osd string:    CEC-Control\n\
CEC version:   1.4\n\
power status:  on\n\
language:      eng\n\
\n\
\n\
currently active source: unknown (-1)\n";

pub const READY_LINE: &str = "waiting for input";

/// What the next `spawn` call does
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnPlan {
    /// Start and print the ready marker right away
    Ready,
    /// Start but print nothing
    Silent,
    /// Fail to start
    Fail,
}

/// Test side of one spawned process
pub struct FakeProcess {
    pub lines: mpsc::Sender<String>,
    pub input: mpsc::UnboundedReceiver<String>,
    pub killed: oneshot::Receiver<()>,
    exit: Option<oneshot::Sender<Option<i32>>>,
}

impl FakeProcess {
    pub async fn say(&self, line: &str) {
        self.lines
            .send(line.to_string())
            .await
            .expect("session stopped reading lines");
    }

    /// Next command written by the session
    pub async fn next_input(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(60), self.input.recv())
            .await
            .expect("no command written")
            .expect("input closed")
    }

    /// Stop producing output without reporting an exit code
    pub fn close_output(&mut self) {
        let (closed, _) = mpsc::channel(1);
        self.lines = closed;
    }

    /// End the process with an exit code
    pub fn exit(mut self, code: Option<i32>) {
        if let Some(exit) = self.exit.take() {
            let _ = exit.send(code);
        }
    }
}

pub struct FakeAdapter {
    scan: Result<String, String>,
    plans: Mutex<VecDeque<SpawnPlan>>,
    default_plan: SpawnPlan,
    processes: mpsc::UnboundedSender<FakeProcess>,
    spawn_count: Mutex<usize>,
}

impl FakeAdapter {
    /// Adapter whose scan prints `scan`; every spawn follows `Ready`
    pub fn new(scan: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<FakeProcess>) {
        Self::build(Ok(scan.to_string()), Vec::new(), SpawnPlan::Ready)
    }

    /// Adapter whose scan command fails
    pub fn failing_scan() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeProcess>) {
        Self::build(Err("exit status: 1".to_string()), Vec::new(), SpawnPlan::Ready)
    }

    /// Spawns follow `plans` in order, then `default_plan`
    pub fn with_plans(
        scan: &str,
        plans: Vec<SpawnPlan>,
        default_plan: SpawnPlan,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<FakeProcess>) {
        Self::build(Ok(scan.to_string()), plans, default_plan)
    }

    fn build(
        scan: Result<String, String>,
        plans: Vec<SpawnPlan>,
        default_plan: SpawnPlan,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<FakeProcess>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let adapter = Arc::new(Self {
            scan,
            plans: Mutex::new(plans.into()),
            default_plan,
            processes: tx,
            spawn_count: Mutex::new(0),
        });
        (adapter, rx)
    }

    pub fn spawn_count(&self) -> usize {
        *self.spawn_count.lock()
    }
}

#[async_trait]
impl Adapter for FakeAdapter {
    fn name(&self) -> &str {
        "fake-cec-client"
    }

    async fn scan(&self) -> Result<String, AdapterError> {
        self.scan.clone().map_err(|status| AdapterError::Failed {
            program: "fake-cec-client".to_string(),
            status,
        })
    }

    async fn spawn(&self) -> Result<AdapterProcess, AdapterError> {
        *self.spawn_count.lock() += 1;
        let plan = self.plans.lock().pop_front().unwrap_or(self.default_plan);

        if plan == SpawnPlan::Fail {
            return Err(AdapterError::Launch {
                program: "fake-cec-client".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }

        let (line_tx, line_rx) = mpsc::channel(1000);
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel();

        if plan == SpawnPlan::Ready {
            line_tx
                .try_send("CEC client registered".to_string())
                .expect("line buffer full");
            line_tx
                .try_send(READY_LINE.to_string())
                .expect("line buffer full");
        }

        let _ = self.processes.send(FakeProcess {
            lines: line_tx,
            input: input_rx,
            killed: kill_rx,
            exit: Some(exit_tx),
        });

        Ok(AdapterProcess {
            lines: line_rx,
            input: input_tx,
            exit: exit_rx,
            kill: Some(kill_tx),
        })
    }
}

/// Answer each written command with the lines `reply` returns
///
/// The task hands the process back once the session closes its input.
pub fn respond<F>(mut process: FakeProcess, mut reply: F) -> JoinHandle<FakeProcess>
where
    F: FnMut(&str) -> Vec<String> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(command) = process.input.recv().await {
            for line in reply(&command) {
                if process.lines.send(line).await.is_err() {
                    return process;
                }
            }
        }
        process
    })
}

pub fn test_config() -> BridgeConfig {
    BridgeConfig::default()
}

/// Next event, failing the test if none arrives within a minute
pub async fn next_event(events: &mut broadcast::Receiver<CecEvent>) -> CecEvent {
    tokio::time::timeout(Duration::from_secs(60), events.recv())
        .await
        .expect("no event")
        .expect("event channel closed")
}

/// All events already queued
pub fn drain_events(events: &mut broadcast::Receiver<CecEvent>) -> Vec<CecEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
