//! Configure the meter, watch levels for ten seconds, stop recording and
//! download everything stored on the device.
//!
//! Run with:
//!   cargo run --example field-session -- /dev/ttyUSB0

use std::time::{Duration, Instant};

use dt8852::device::{
    Device, DeviceConfig, FrequencyWeighting, ModeRequestSet, ModeSetting, Range,
    RecordingState, TimeWeighting, Token,
};
use dt8852::transport::{SerialConfig, DEFAULT_PORT};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PORT.to_string());
    let mut meter = Device::open(&port, &SerialConfig::default(), DeviceConfig::default())?;
    eprintln!("Connected to {port}");

    let mut pending: ModeRequestSet = [
        ModeSetting::from(Range::R30To80),
        ModeSetting::from(TimeWeighting::Slow),
        ModeSetting::from(FrequencyWeighting::DbC),
        ModeSetting::from(RecordingState::Recording),
    ]
    .into_iter()
    .collect();
    meter.set_mode(pending.as_slice())?;
    while !pending.is_empty() {
        if let Token::ModeAck(setting) = meter.next_token()? {
            if pending.acknowledge(&setting) {
                eprintln!("Acknowledged {setting}");
            }
        }
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        match meter.next_token() {
            Ok(Token::Measurement(m)) if m.changed => {
                println!("{}: {} dB", m.channel.name(), m.value);
            }
            Ok(_) => {}
            Err(err) if err.is_timeout() => {}
            Err(err) => return Err(err.into()),
        }
    }

    let mut stop: ModeRequestSet = [RecordingState::NotRecording].into_iter().collect();
    meter.set_mode(stop.as_slice())?;
    while !stop.is_empty() {
        if let Token::ModeAck(setting) = meter.next_token()? {
            stop.acknowledge(&setting);
        }
    }

    for record in meter.get_recordings()? {
        match record {
            Ok(record) => println!(
                "session {} sample {}: {} dB",
                record.session_id, record.sample_index, record.value
            ),
            Err(err) if err.is_timeout() => {}
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
