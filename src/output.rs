use std::io::{self, Write};

use serde::Serialize;

use crate::domain::{ArchiveEntry, FileRole};
use crate::pipeline::{GeneratedDataset, ProgressEvent, ProgressKind, ProgressSink};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_generated(result: &GeneratedDataset) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_inspect(result: &InspectResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards pipeline progress to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        let stage = event.stage;
        let elapsed_ms = event.elapsed.map(|elapsed| elapsed.as_millis() as u64);
        match event.kind {
            ProgressKind::Started => {
                tracing::debug!(stage = %stage, "{}", event.message)
            }
            ProgressKind::Finished => {
                tracing::info!(stage = %stage, elapsed_ms, "{}", event.message)
            }
            ProgressKind::Warning => {
                tracing::warn!(stage = %stage, "{}", event.message)
            }
            ProgressKind::Failed => {
                tracing::error!(stage = %stage, elapsed_ms, "{}", event.message)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectResult {
    pub archive: String,
    pub entries: Vec<InspectEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectEntry {
    pub order: usize,
    pub filename: String,
    pub byte_size: u64,
    pub role: FileRole,
}

impl InspectResult {
    pub fn new(archive: impl Into<String>, classified: Vec<(ArchiveEntry, FileRole)>) -> Self {
        Self {
            archive: archive.into(),
            entries: classified
                .into_iter()
                .enumerate()
                .map(|(order, (entry, role))| InspectEntry {
                    order,
                    filename: entry.filename,
                    byte_size: entry.byte_size,
                    role,
                })
                .collect(),
        }
    }
}
