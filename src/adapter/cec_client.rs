//! `cec-client` adapter backed by `tokio::process`

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot};
use std::time::Duration;
use tokio_stream::wrappers::SplitStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, trace, warn};

use super::{Adapter, AdapterProcess};
use crate::config::BridgeConfig;
use crate::error::AdapterError;

/// Capacity of the stdout line channel
const LINE_CHANNEL_CAPACITY: usize = 1000;
/// How long a process may linger after closing stdout before it is killed
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Runs libCEC's `cec-client` binary
pub struct CecClientAdapter {
    program: String,
    device_type: char,
    osd_string: String,
    scan_log_level: u8,
    monitor_log_level: u8,
}

impl CecClientAdapter {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            program: config.adapter.program.clone(),
            device_type: config.device_type_code(),
            osd_string: config.osd_string.clone(),
            scan_log_level: config.adapter.scan_log_level,
            monitor_log_level: config.adapter.monitor_log_level,
        }
    }

    /// Arguments for a session with the given `-d` log level
    fn args(&self, log_level: u8) -> Vec<String> {
        vec![
            "-t".to_string(),
            self.device_type.to_string(),
            "-o".to_string(),
            self.osd_string.clone(),
            "-d".to_string(),
            log_level.to_string(),
        ]
    }

    fn launch_error(&self, source: std::io::Error) -> AdapterError {
        AdapterError::Launch {
            program: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl Adapter for CecClientAdapter {
    fn name(&self) -> &str {
        &self.program
    }

    async fn scan(&self) -> Result<String, AdapterError> {
        let mut args = vec!["-s".to_string()];
        args.extend(self.args(self.scan_log_level));
        debug!("Running scan: {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let mut stdin = child.stdin.take().ok_or(AdapterError::MissingPipe("stdin"))?;
        stdin.write_all(b"scan\n").await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(AdapterError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn spawn(&self) -> Result<AdapterProcess, AdapterError> {
        let args = self.args(self.monitor_log_level);
        info!("Starting {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let stdin = child.stdin.take().ok_or(AdapterError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(AdapterError::MissingPipe("stdout"))?;

        let (line_tx, line_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel();

        tokio::spawn(write_commands(stdin, input_rx));
        tokio::spawn(read_lines(child, stdout, line_tx, exit_tx, kill_rx));

        Ok(AdapterProcess {
            lines: line_rx,
            input: input_tx,
            exit: exit_rx,
            kill: Some(kill_tx),
        })
    }
}

/// Forward queued commands to the process stdin, one per line
async fn write_commands(mut stdin: ChildStdin, mut input_rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = input_rx.recv().await {
        trace!("stdin <- {}", line);
        let mut bytes = line.into_bytes();
        bytes.push(b'\n');
        if let Err(e) = stdin.write_all(&bytes).await {
            warn!("Failed to write to adapter stdin: {}", e);
            break;
        }
        if let Err(e) = stdin.flush().await {
            warn!("Failed to flush adapter stdin: {}", e);
            break;
        }
    }
}

/// Decode one raw stdout line; invalid UTF-8 becomes U+FFFD
fn decode_line(mut raw: Vec<u8>) -> String {
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    match String::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Forward stdout lines until EOF or a kill request, then report the exit code
async fn read_lines(
    mut child: Child,
    stdout: tokio::process::ChildStdout,
    line_tx: mpsc::Sender<String>,
    exit_tx: oneshot::Sender<Option<i32>>,
    mut kill_rx: oneshot::Receiver<()>,
) {
    let mut lines = SplitStream::new(BufReader::new(stdout).split(b'\n'));

    loop {
        tokio::select! {
            next = lines.next() => match next {
                Some(Ok(raw)) => {
                    if line_tx.send(decode_line(raw)).await.is_err() {
                        debug!("Line receiver dropped, stopping adapter reader");
                        kill(&mut child);
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!("Failed to read adapter output: {}", e);
                    kill(&mut child);
                    break;
                }
                None => break,
            },
            _ = &mut kill_rx => {
                debug!("Kill requested for adapter process");
                kill(&mut child);
                break;
            }
        }
    }

    // Close the line channel before reporting the exit code
    drop(line_tx);

    let status = match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!("Adapter process still running after closing stdout, killing it");
            kill(&mut child);
            child.wait().await
        }
    };
    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!("Failed to wait for adapter process: {}", e);
            None
        }
    };
    debug!("Adapter process exited with code {:?}", code);
    let _ = exit_tx.send(code);
}

fn kill(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("Failed to kill adapter process: {}", e);
    }
}
