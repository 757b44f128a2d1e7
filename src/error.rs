use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::ArchiveKind;

#[derive(Debug, Error, Diagnostic)]
pub enum CcviError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("{url} returned status {status}: {message}")]
    NetworkStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("archive {path} is unreadable: {message}")]
    ArchiveCorrupt { path: String, message: String },

    #[error("malformed data in {path}: {message}")]
    MalformedData { path: String, message: String },

    #[error("quarter value {value} in {path} is outside 1..=4")]
    AmbiguousQuarter { path: String, value: i64 },

    #[error("{archive} archive has no README.md")]
    MissingStructureDoc { archive: ArchiveKind },

    #[error("{stage} failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<CcviError>,
    },

    #[error("missing config file ccvi.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("invalid role pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl CcviError {
    pub fn in_stage(self, stage: PipelineStage) -> Self {
        CcviError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through stage wrappers.
    pub fn root(&self) -> &CcviError {
        match self {
            CcviError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            CcviError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    FetchQuarterly,
    ExtractAndClassifyQuarterly,
    AssembleQuarterlyResources,
    FetchFull,
    ExtractAndClassifyFull,
    DeriveTimePeriod,
    AssembleFullResources,
    MergeAndBuildDescriptor,
}

impl PipelineStage {
    pub fn archive(&self) -> Option<ArchiveKind> {
        match self {
            PipelineStage::FetchQuarterly
            | PipelineStage::ExtractAndClassifyQuarterly
            | PipelineStage::AssembleQuarterlyResources => Some(ArchiveKind::Quarterly),
            PipelineStage::FetchFull
            | PipelineStage::ExtractAndClassifyFull
            | PipelineStage::DeriveTimePeriod
            | PipelineStage::AssembleFullResources => Some(ArchiveKind::Full),
            PipelineStage::MergeAndBuildDescriptor => None,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::FetchQuarterly => "fetch (quarterly archive)",
            PipelineStage::ExtractAndClassifyQuarterly => "extract (quarterly archive)",
            PipelineStage::AssembleQuarterlyResources => "assemble (quarterly archive)",
            PipelineStage::FetchFull => "fetch (full archive)",
            PipelineStage::ExtractAndClassifyFull => "extract (full archive)",
            PipelineStage::DeriveTimePeriod => "time period (full archive)",
            PipelineStage::AssembleFullResources => "assemble (full archive)",
            PipelineStage::MergeAndBuildDescriptor => "build dataset",
        };
        f.write_str(name)
    }
}
