use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use netsdr_frame::{Message, MessageType};
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
struct ReplyOutput<'a> {
    kind: &'static str,
    msg_type: &'static str,
    item: Option<&'a str>,
    nak: bool,
    params: String,
    timestamp: String,
}

pub fn print_reply(reply: &Message, format: OutputFormat) {
    let item = reply.item.map(|item| item.name());
    let params = hex(reply.body.as_ref());
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                kind: "reply",
                msg_type: type_name(reply.msg_type),
                item,
                nak: reply.is_nak(),
                params,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "ITEM", "NAK", "PARAMS"])
                .add_row(vec![
                    type_name(reply.msg_type).to_string(),
                    item.unwrap_or("-").to_string(),
                    reply.is_nak().to_string(),
                    params,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if reply.is_nak() {
                println!("type={} NAK", type_name(reply.msg_type));
            } else {
                println!(
                    "type={} item={} params=[{}]",
                    type_name(reply.msg_type),
                    item.unwrap_or("-"),
                    params
                );
            }
        }
    }
}

/// Result of a completed capture.
#[derive(Debug, Serialize)]
pub struct RecordSummary {
    pub path: String,
    pub sample_bits: u8,
    pub samples_written: u64,
    pub bytes_written: u64,
    pub elapsed_ms: u64,
}

impl RecordSummary {
    pub fn new(path: &Path, sample_bits: u8, samples_written: u64, elapsed: Duration) -> Self {
        Self {
            path: path.display().to_string(),
            sample_bits,
            samples_written,
            bytes_written: samples_written * u64::from(sample_bits / 8),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

pub fn print_record_summary(summary: &RecordSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FILE", "WIDTH", "SAMPLES", "BYTES", "ELAPSED"])
                .add_row(vec![
                    summary.path.clone(),
                    format!("{} bit", summary.sample_bits),
                    summary.samples_written.to_string(),
                    summary.bytes_written.to_string(),
                    format!("{} ms", summary.elapsed_ms),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "recorded {} samples ({} bytes, {}-bit) to {} in {} ms",
                summary.samples_written,
                summary.bytes_written,
                summary.sample_bits,
                summary.path,
                summary.elapsed_ms
            );
        }
    }
}

/// Statistics over a recorded sample file.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub path: String,
    pub sample_bits: u8,
    pub samples: usize,
    pub trailing_bytes: usize,
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub head: Vec<i32>,
}

pub fn print_inspect(report: &InspectReport, format: OutputFormat) {
    let range = |value: Option<i32>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
    let head = report
        .head
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FILE", "WIDTH", "SAMPLES", "MIN", "MAX", "HEAD"])
                .add_row(vec![
                    report.path.clone(),
                    format!("{} bit", report.sample_bits),
                    report.samples.to_string(),
                    range(report.min),
                    range(report.max),
                    head,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{}: {} samples ({}-bit) min={} max={}",
                report.path,
                report.samples,
                report.sample_bits,
                range(report.min),
                range(report.max)
            );
            if !head.is_empty() {
                println!("head: {head}");
            }
            if report.trailing_bytes > 0 {
                println!("trailing partial sample: {} bytes", report.trailing_bytes);
            }
        }
    }
}

pub fn type_name(msg_type: MessageType) -> &'static str {
    match msg_type {
        MessageType::SetControlItem => "SET",
        MessageType::CurrentControlItem => "CURRENT",
        MessageType::ControlItemRange => "RANGE",
        MessageType::Ack => "ACK",
        MessageType::DataItem0
        | MessageType::DataItem1
        | MessageType::DataItem2
        | MessageType::DataItem3 => "DATA",
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_bytes_from_width() {
        let summary =
            RecordSummary::new(Path::new("iq.bin"), 24, 10, Duration::from_millis(1500));
        assert_eq!(summary.bytes_written, 30);
        assert_eq!(summary.elapsed_ms, 1500);
    }

    #[test]
    fn hex_is_uppercase_and_spaced() {
        assert_eq!(hex(&[0x01, 0xab]), "01 AB");
        assert_eq!(hex(&[]), "");
    }
}
