use std::collections::BTreeSet;
use std::fmt;

use camino::Utf8PathBuf;
use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    Quarterly,
    Full,
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveKind::Quarterly => write!(f, "quarterly"),
            ArchiveKind::Full => write!(f, "full"),
        }
    }
}

/// One file listed in an archive index. Identity is the filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArchiveEntry {
    pub filename: String,
    pub byte_size: u64,
}

impl ArchiveEntry {
    pub fn new(filename: impl Into<String>, byte_size: u64) -> Self {
        Self {
            filename: filename.into(),
            byte_size,
        }
    }

    /// Extension after the last dot of the final path component, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let base = self
            .filename
            .rsplit('/')
            .next()
            .unwrap_or(self.filename.as_str());
        match base.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&base[idx + 1..]),
        }
    }

    /// Resource format: lowercase extension, empty when the file has none.
    pub fn format(&self) -> String {
        self.extension()
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn is_columnar(&self) -> bool {
        self.format() == "parquet"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    StructureDoc,
    PrimaryTimeSeries,
    Payload,
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRole::StructureDoc => write!(f, "structure_doc"),
            FileRole::PrimaryTimeSeries => write!(f, "primary_time_series"),
            FileRole::Payload => write!(f, "payload"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyStrategy {
    /// One resource per archive member.
    #[default]
    Full,
    /// One resource per archive, pointing at the archive itself.
    Summary,
}

impl fmt::Display for AssemblyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyStrategy::Full => write!(f, "full"),
            AssemblyStrategy::Summary => write!(f, "summary"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimePeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimePeriod {
    /// `None` when `start` is after `end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} TO {}]",
            self.start.format("%Y-%m-%dT%H:%M:%S"),
            self.end.format("%Y-%m-%dT%H:%M:%S")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    pub name: String,
    pub description: String,
    pub format: String,
    pub source_path: Utf8PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetDescriptor {
    pub name: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub time_period: TimePeriod,
    pub resources: Vec<ResourceDescriptor>,
}

impl DatasetDescriptor {
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources
            .iter()
            .map(|resource| resource.name.as_str())
            .collect()
    }
}
