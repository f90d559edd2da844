use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dt8852::device::{Device, DeviceConfig, ModeCategory, ModeRequestSet, SerialDevice, Token};
use tracing::{debug, info};

use crate::cmd::LinkArgs;
use crate::exit::{session_error, CliError, CliResult, INTERNAL, TIMEOUT};
use crate::output::EventPrinter;

pub fn open(link: &LinkArgs) -> CliResult<SerialDevice> {
    let serial = link.serial_config()?;
    let device = Device::open(&link.port, &serial, DeviceConfig::default())
        .map_err(|err| session_error("open failed", err))?;
    info!(port = %link.port, baud = serial.baud_rate, "connected");
    Ok(device)
}

/// Next token, or `None` once `deadline` passes.
///
/// Serial read timeouts just mean the meter had nothing to say; they are
/// retried until the deadline.
pub fn next_before<R: Read, W: Write>(
    device: &mut Device<R, W>,
    deadline: Instant,
) -> CliResult<Option<Token>> {
    while Instant::now() < deadline {
        match device.next_token() {
            Ok(token) => return Ok(Some(token)),
            Err(err) if err.is_timeout() => continue,
            Err(err) => return Err(session_error("read failed", err)),
        }
    }
    Ok(None)
}

/// Send every pending setting and consume acknowledgments until none are
/// left. Measurements arriving in between are skipped.
pub fn apply_modes<R: Read, W: Write>(
    device: &mut Device<R, W>,
    pending: &mut ModeRequestSet,
    deadline: Instant,
    printer: &mut EventPrinter,
) -> CliResult<()> {
    device
        .set_mode(pending.as_slice())
        .map_err(|err| session_error("set mode failed", err))?;

    while !pending.is_empty() {
        let Some(token) = next_before(device, deadline)? else {
            let missing: Vec<&str> = pending.iter().map(|s| s.category().name()).collect();
            return Err(CliError::new(
                TIMEOUT,
                format!("no acknowledgment for: {}", missing.join(", ")),
            ));
        };
        match token {
            Token::ModeAck(setting) => {
                if pending.acknowledge(&setting) {
                    printer.mode_ack(&setting);
                } else if pending.pending_for(setting.category()).is_some() {
                    debug!(%setting, "ack does not match requested value yet");
                } else {
                    debug!(%setting, "unsolicited ack");
                }
            }
            other => debug!(token = other.name(), "skipped while waiting for acks"),
        }
    }
    Ok(())
}

/// Print measurements until `deadline` or until `running` is cleared.
/// Returns the number printed.
pub fn monitor<R: Read, W: Write>(
    device: &mut Device<R, W>,
    deadline: Instant,
    all: bool,
    running: &AtomicBool,
    printer: &mut EventPrinter,
) -> CliResult<usize> {
    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let Some(token) = next_before(device, deadline)? else {
            break;
        };
        match token {
            Token::Measurement(m) if all || m.changed => {
                printer.measurement(&m);
                printed = printed.saturating_add(1);
            }
            Token::Measurement(_) => {}
            Token::ModeAck(setting) => {
                if setting.category() == ModeCategory::Recording {
                    info!(%setting, "recording state changed on device");
                }
            }
            other => debug!(token = other.name(), "ignored while monitoring"),
        }
    }
    Ok(printed)
}

/// Request and print every stored record. Returns the number printed.
///
/// Serial read timeouts are retried as long as the last record arrived less
/// than `idle` ago.
pub fn dump<R: Read, W: Write>(
    device: &mut Device<R, W>,
    idle: Duration,
    printer: &mut EventPrinter,
) -> CliResult<usize> {
    let mut records = device
        .get_recordings()
        .map_err(|err| session_error("dump request failed", err))?;
    let mut last_progress = Instant::now();
    while let Some(record) = records.next() {
        match record {
            Ok(record) => {
                printer.record(&record);
                last_progress = Instant::now();
            }
            Err(err) if err.is_timeout() => {
                if last_progress.elapsed() >= idle {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!(
                            "dump stalled after {} records: no data for {idle:?}",
                            records.records()
                        ),
                    ));
                }
                debug!("meter quiet during dump; waiting");
            }
            Err(err) => return Err(session_error("dump failed", err)),
        }
    }
    let count = records.records();
    info!(records = count, "dump complete");
    Ok(count)
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
