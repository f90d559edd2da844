use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use dt8852::device::{Measurement, ModeSetting, RecordingRecord};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum EventOutput<'a> {
    ModeAck {
        category: &'static str,
        value: String,
        timestamp: String,
    },
    Measurement {
        channel: &'static str,
        db: f32,
        changed: bool,
        timestamp: &'a str,
    },
    Record {
        session_id: u16,
        sample_index: u32,
        db: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        device_time: Option<u32>,
    },
}

/// Prints session events as they arrive.
///
/// JSON and pretty output stream one line per event. Table output collects
/// rows per event kind and renders them on [`finish`](Self::finish).
pub struct EventPrinter {
    format: OutputFormat,
    readings: Vec<Vec<String>>,
    records: Vec<Vec<String>>,
}

impl EventPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            readings: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn mode_ack(&mut self, setting: &ModeSetting) {
        match self.format {
            OutputFormat::Json => emit_json(&EventOutput::ModeAck {
                category: setting.category().name(),
                value: setting.to_string(),
                timestamp: now_unix_seconds(),
            }),
            // Acks are few; show them immediately even in table mode.
            OutputFormat::Table | OutputFormat::Pretty => {
                println!("ack {}={setting}", setting.category().name());
            }
        }
    }

    pub fn measurement(&mut self, m: &Measurement) {
        let timestamp = now_unix_seconds();
        match self.format {
            OutputFormat::Json => emit_json(&EventOutput::Measurement {
                channel: m.channel.name(),
                db: m.value.db(),
                changed: m.changed,
                timestamp: &timestamp,
            }),
            OutputFormat::Table => self.readings.push(vec![
                timestamp,
                m.channel.name().to_string(),
                m.value.to_string(),
                if m.changed { "yes" } else { "no" }.to_string(),
            ]),
            OutputFormat::Pretty => {
                println!("{} {} dB ({})", m.channel.name(), m.value, timestamp);
            }
        }
    }

    pub fn record(&mut self, r: &RecordingRecord) {
        let device_time = r.timestamp.map(|t| t.to_string()).unwrap_or_default();
        match self.format {
            OutputFormat::Json => emit_json(&EventOutput::Record {
                session_id: r.session_id,
                sample_index: r.sample_index,
                db: r.value.db(),
                device_time: r.timestamp,
            }),
            OutputFormat::Table => self.records.push(vec![
                r.session_id.to_string(),
                r.sample_index.to_string(),
                r.value.to_string(),
                device_time,
            ]),
            OutputFormat::Pretty => {
                println!(
                    "session={} sample={} level={} dB{}",
                    r.session_id,
                    r.sample_index,
                    r.value,
                    r.timestamp
                        .map(|t| format!(" device_time={t}"))
                        .unwrap_or_default()
                );
            }
        }
    }

    /// Render whatever table rows were collected.
    pub fn finish(&mut self) {
        if !self.readings.is_empty() {
            print_table(
                vec!["TIME", "CHANNEL", "LEVEL (dB)", "CHANGED"],
                std::mem::take(&mut self.readings),
            );
        }
        if !self.records.is_empty() {
            print_table(
                vec!["SESSION", "SAMPLE", "LEVEL (dB)", "DEVICE TIME"],
                std::mem::take(&mut self.records),
            );
        }
    }
}

fn print_table(header: Vec<&str>, rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

fn emit_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
