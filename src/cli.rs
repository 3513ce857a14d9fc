//! Command-line interface and REPL

use anyhow::Result;
use chrono::Local;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use cec_bridge::{CecBridge, CecEvent, Device, DeviceTable, LogicalAddress};

const PROMPT: &str = "cec> ";

/// One parsed REPL line
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Devices,
    On(String),
    Off(String),
    Status(String),
    Active,
    Inactive,
    Source(Option<u8>),
    VolumeUp,
    VolumeDown,
    Mute,
    Raw(String),
    Help,
    Quit,
}

/// Parse a REPL line; `Ok(None)` for blank input
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let device_arg = |cmd: fn(String) -> ReplCommand| {
        if rest.is_empty() {
            Err(format!("usage: {} <device>", word))
        } else {
            Ok(Some(cmd(device_key(rest))))
        }
    };

    match word.to_ascii_lowercase().as_str() {
        "devices" | "ls" => Ok(Some(ReplCommand::Devices)),
        "on" => device_arg(ReplCommand::On),
        "off" | "standby" => device_arg(ReplCommand::Off),
        "status" | "pow" => device_arg(ReplCommand::Status),
        "active" | "as" => Ok(Some(ReplCommand::Active)),
        "inactive" | "is" => Ok(Some(ReplCommand::Inactive)),
        "source" => {
            if rest.is_empty() {
                Ok(Some(ReplCommand::Source(None)))
            } else {
                rest.parse::<u8>()
                    .map(|port| Some(ReplCommand::Source(Some(port))))
                    .map_err(|_| format!("invalid HDMI port: {}", rest))
            }
        }
        "volup" => Ok(Some(ReplCommand::VolumeUp)),
        "voldown" => Ok(Some(ReplCommand::VolumeDown)),
        "mute" => Ok(Some(ReplCommand::Mute)),
        "raw" | "tx" if !rest.is_empty() => {
            let text = if word.eq_ignore_ascii_case("tx") {
                format!("tx {}", rest)
            } else {
                rest.to_string()
            };
            Ok(Some(ReplCommand::Raw(text)))
        }
        "raw" | "tx" => Err("usage: raw <adapter command>".to_string()),
        "help" | "?" => Ok(Some(ReplCommand::Help)),
        "quit" | "exit" | "q" => Ok(Some(ReplCommand::Quit)),
        other => Err(format!("unknown command: {}", other)),
    }
}

/// `dev4`, `4` and `DEV4` all name the same device
fn device_key(arg: &str) -> String {
    match LogicalAddress::parse(arg) {
        Some(address) => address.device_key(),
        None => match arg.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("dev") => {
                format!("dev{}", arg[3..].to_ascii_uppercase())
            }
            _ => arg.to_string(),
        },
    }
}

/// Run the interactive prompt until `quit` or end of input
///
/// rustyline blocks, so the editor lives on a blocking thread and hands
/// lines over a channel.
pub async fn run_repl(bridge: CecBridge) -> Result<()> {
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);

    let reader = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    });

    print_help();

    while let Some(line) = line_rx.recv().await {
        match parse_command(&line) {
            Ok(Some(ReplCommand::Quit)) => break,
            Ok(Some(cmd)) => execute(&bridge, cmd).await,
            Ok(None) => {}
            Err(message) => println!("{}", message.red()),
        }
    }

    // Unblocks the reader on its next line
    drop(line_rx);
    if reader.is_finished() {
        reader.await??;
    }

    Ok(())
}

async fn execute(bridge: &CecBridge, cmd: ReplCommand) {
    debug!(?cmd, "Executing REPL command");

    match cmd {
        ReplCommand::Devices => match bridge.table().await {
            Some(table) => print_devices(&table),
            None => println!("{}", "Session closed".red()),
        },
        ReplCommand::On(key) => {
            let Some(device) = find_device(bridge, &key) else {
                return;
            };
            print_result("on", device.turn_on().await);
        }
        ReplCommand::Off(key) => {
            let Some(device) = find_device(bridge, &key) else {
                return;
            };
            print_result("standby", device.turn_off().await);
        }
        ReplCommand::Status(key) => {
            let Some(device) = find_device(bridge, &key) else {
                return;
            };
            print_result("power status", device.handle().status().await);
        }
        ReplCommand::Active => print_result("active source", bridge.set_active().await),
        ReplCommand::Inactive => print_result("active source", bridge.set_inactive().await),
        ReplCommand::Source(port) => {
            let tv = bridge.devices().into_iter().find_map(|d| match d {
                Device::Tv(tv) => Some(tv),
                Device::Generic(_) => None,
            });
            match tv {
                Some(tv) => print_result("source", tv.change_source(port).await),
                None => println!("{}", "No TV found on the bus".red()),
            }
        }
        ReplCommand::VolumeUp => print_result("volup", bridge.volume_up().await),
        ReplCommand::VolumeDown => print_result("voldown", bridge.volume_down().await),
        ReplCommand::Mute => print_result("mute", bridge.mute().await),
        ReplCommand::Raw(text) => print_result(&text, bridge.command(&text).await),
        ReplCommand::Help => print_help(),
        ReplCommand::Quit => {}
    }
}

fn find_device(bridge: &CecBridge, key: &str) -> Option<Device> {
    let device = bridge.device(key);
    if device.is_none() {
        println!("{} {}", "Unknown device".red(), key.yellow());
    }
    device
}

fn print_result<T: std::fmt::Display>(what: &str, result: Option<T>) {
    match result {
        Some(value) => println!("{} {}", format!("{}:", what).bold(), value.to_string().green()),
        None => println!("{} {}", format!("{}:", what).bold(), "no answer".yellow()),
    }
}

fn print_help() {
    println!("{}", "=== CEC Bridge ===".bold().cyan());
    println!(
        "{}",
        "devices | on <dev> | off <dev> | status <dev> | active | inactive".dimmed()
    );
    println!(
        "{}",
        "source [n] | volup | voldown | mute | raw <text> | quit".dimmed()
    );
}

/// Print the device table
pub fn print_devices(table: &DeviceTable) {
    println!("\n{}", "Devices:".bold());
    for (key, record) in table.iter() {
        let marker = if table.self_key() == Some(key.as_str()) {
            " (self)".cyan().to_string()
        } else {
            String::new()
        };
        let power = record
            .power_status
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let osd = record.osd_string.as_deref().unwrap_or("-");

        println!(
            "  {:6} {:20} osd: {:14} power: {}{}",
            key.yellow(),
            record.name,
            osd,
            power.green(),
            marker
        );
    }
    println!();
}

/// Print one event with a local timestamp
pub fn print_event(event: &CecEvent) {
    let timestamp = Local::now().format("%H:%M:%S%.3f").to_string();
    let name = event.name();

    let detail = match event {
        CecEvent::Ready => "adapter ready".green(),
        CecEvent::Error { message } => message.bright_red(),
        CecEvent::PowerStatus { status, .. } => match status {
            Some(status) => status.to_string().bright_green(),
            None => "no answer".yellow(),
        },
        CecEvent::ActiveSource { active, .. } => match active {
            Some(active) => active.to_string().bright_green(),
            None => "no answer".yellow(),
        },
        CecEvent::KeyPress(key) => key.to_string().bright_cyan(),
        CecEvent::KeyDown(key) => key.to_string().bright_magenta(),
        CecEvent::KeyUp(key) => key.to_string().bright_blue(),
    };

    println!("[{}] {:16} {}", timestamp.dimmed(), name.white(), detail);
}

/// Print events until the session goes away
pub async fn print_events(mut events: tokio::sync::broadcast::Receiver<CecEvent>, json: bool) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(event) if json => match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize event: {}", e),
            },
            Ok(event) => print_event(&event),
            Err(RecvError::Lagged(skipped)) => warn!("Event printer skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}
