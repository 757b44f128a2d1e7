use std::collections::BTreeSet;
use std::fs;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::archive::ArchiveReader;
use crate::assemble::{ArchiveBundle, AssembledResources, ExtractedEntry, ResourceAssembler};
use crate::classify::order_for_extraction;
use crate::columnar::ColumnarReader;
use crate::config::ResolvedConfig;
use crate::domain::{ArchiveKind, DatasetDescriptor, FileRole, ResourceDescriptor, TimePeriod};
use crate::error::{CcviError, PipelineStage};
use crate::fetch::Fetcher;
use crate::period::extract_period;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    Started,
    Finished,
    Warning,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: PipelineStage,
    pub kind: ProgressKind,
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDataset {
    pub dataset: DatasetDescriptor,
    /// Recoverable conditions met during the run, such as a missing README.
    pub warnings: Vec<String>,
}

pub struct Pipeline<F: Fetcher, A: ArchiveReader, C: ColumnarReader> {
    config: ResolvedConfig,
    fetcher: F,
    archives: A,
    columns: C,
    workdir: Utf8PathBuf,
}

impl<F: Fetcher, A: ArchiveReader, C: ColumnarReader> Pipeline<F, A, C> {
    /// `workdir` receives the extracted files and must outlive publishing.
    pub fn new(
        config: ResolvedConfig,
        fetcher: F,
        archives: A,
        columns: C,
        workdir: Utf8PathBuf,
    ) -> Self {
        Self {
            config,
            fetcher,
            archives,
            columns,
            workdir,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn generate_dataset(&self, sink: &dyn ProgressSink) -> Result<GeneratedDataset, CcviError> {
        let span = tracing::info_span!(
            "generate_dataset",
            dataset = %self.config.dataset.name,
            strategy = %self.config.strategy
        );
        let _guard = span.enter();

        let assembler = self.config.strategy.assembler();
        let mut warnings = Vec::new();

        let qtr_path = self.run_stage(sink, PipelineStage::FetchQuarterly, || {
            self.fetcher
                .fetch(&self.config.qtr_url, Some(&self.config.qtr_filename))
        })?;
        let (qtr_entries, qtr_has_doc) =
            self.run_stage(sink, PipelineStage::ExtractAndClassifyQuarterly, || {
                self.extract_and_classify(ArchiveKind::Quarterly, &qtr_path, assembler.as_ref())
            })?;
        let qtr = self.run_stage(sink, PipelineStage::AssembleQuarterlyResources, || {
            Ok(assembler.assemble(ArchiveBundle {
                kind: ArchiveKind::Quarterly,
                archive_path: &qtr_path,
                entries: &qtr_entries,
                has_structure_doc: qtr_has_doc,
            }))
        })?;
        let mut resources =
            take_resources(sink, PipelineStage::AssembleQuarterlyResources, qtr, &mut warnings);

        let full_path = self.run_stage(sink, PipelineStage::FetchFull, || {
            self.fetcher
                .fetch(&self.config.full_url, Some(&self.config.full_filename))
        })?;
        let (full_entries, full_has_doc) =
            self.run_stage(sink, PipelineStage::ExtractAndClassifyFull, || {
                self.extract_and_classify(ArchiveKind::Full, &full_path, assembler.as_ref())
            })?;
        let time_period = self.run_stage(sink, PipelineStage::DeriveTimePeriod, || {
            self.derive_period(&full_entries, sink, &mut warnings)
        })?;
        let full = self.run_stage(sink, PipelineStage::AssembleFullResources, || {
            Ok(assembler.assemble(ArchiveBundle {
                kind: ArchiveKind::Full,
                archive_path: &full_path,
                entries: &full_entries,
                has_structure_doc: full_has_doc,
            }))
        })?;
        resources.extend(take_resources(
            sink,
            PipelineStage::AssembleFullResources,
            full,
            &mut warnings,
        ));

        let dataset = self.run_stage(sink, PipelineStage::MergeAndBuildDescriptor, || {
            Ok(DatasetDescriptor {
                name: self.config.dataset.name.clone(),
                title: self.config.dataset.title.clone(),
                tags: self.config.dataset.tags.iter().cloned().collect::<BTreeSet<_>>(),
                time_period,
                resources,
            })
        })?;
        tracing::info!(
            resources = dataset.resources.len(),
            period = %dataset.time_period,
            warnings = warnings.len(),
            "dataset descriptor ready"
        );
        Ok(GeneratedDataset { dataset, warnings })
    }

    fn run_stage<T>(
        &self,
        sink: &dyn ProgressSink,
        stage: PipelineStage,
        body: impl FnOnce() -> Result<T, CcviError>,
    ) -> Result<T, CcviError> {
        sink.event(ProgressEvent {
            stage,
            kind: ProgressKind::Started,
            message: format!("{stage} started"),
            elapsed: None,
        });
        let start = Instant::now();
        match body() {
            Ok(value) => {
                sink.event(ProgressEvent {
                    stage,
                    kind: ProgressKind::Finished,
                    message: format!("{stage} finished"),
                    elapsed: Some(start.elapsed()),
                });
                Ok(value)
            }
            Err(err) => {
                sink.event(ProgressEvent {
                    stage,
                    kind: ProgressKind::Failed,
                    message: err.to_string(),
                    elapsed: Some(start.elapsed()),
                });
                Err(err.in_stage(stage))
            }
        }
    }

    /// Lists the archive, orders it largest first and extracts what the
    /// assembler needs. Each archive gets its own directory so members with
    /// the same name in both archives do not overwrite each other.
    ///
    /// The flag reports whether the listing held a structure doc, even when
    /// the assembler did not ask for it to be extracted.
    fn extract_and_classify(
        &self,
        kind: ArchiveKind,
        archive_path: &Utf8Path,
        assembler: &dyn ResourceAssembler,
    ) -> Result<(Vec<ExtractedEntry>, bool), CcviError> {
        let dest_dir = self.workdir.join(kind.to_string());
        fs::create_dir_all(dest_dir.as_std_path())
            .map_err(|err| CcviError::Filesystem(format!("create {dest_dir}: {err}")))?;

        let listed = self.archives.list_entries(archive_path)?;
        let ordered = order_for_extraction(&listed);
        let mut extracted = Vec::with_capacity(ordered.len());
        let mut has_structure_doc = false;
        for (entry, role) in self.config.roles.classify(&ordered) {
            has_structure_doc |= role == FileRole::StructureDoc;
            let wanted = assembler.extracts_members()
                || (kind == ArchiveKind::Full && role == FileRole::PrimaryTimeSeries);
            if !wanted {
                continue;
            }
            let local_path = self.archives.extract(archive_path, &entry, &dest_dir)?;
            tracing::debug!(%kind, file = %entry.filename, %role, size = entry.byte_size, "classified");
            extracted.push(ExtractedEntry {
                entry,
                role,
                local_path,
            });
        }
        Ok((extracted, has_structure_doc))
    }

    fn derive_period(
        &self,
        entries: &[ExtractedEntry],
        sink: &dyn ProgressSink,
        warnings: &mut Vec<String>,
    ) -> Result<TimePeriod, CcviError> {
        // Later files override earlier ones, so the smallest series decides.
        let series: Vec<&ExtractedEntry> = entries
            .iter()
            .filter(|item| item.role == FileRole::PrimaryTimeSeries)
            .collect();
        let (primary, overridden) =
            series.split_last().ok_or_else(|| CcviError::MalformedData {
                path: self.config.full_url.clone(),
                message: "full archive has no primary time series file".to_string(),
            })?;
        for ignored in overridden {
            warn(
                sink,
                PipelineStage::DeriveTimePeriod,
                format!(
                    "time period taken from {}; ignoring {}",
                    primary.entry.filename, ignored.entry.filename
                ),
                warnings,
            );
        }
        extract_period(
            &self.columns,
            &primary.local_path,
            &self.config.year_column,
            &self.config.quarter_column,
        )
    }
}

fn take_resources(
    sink: &dyn ProgressSink,
    stage: PipelineStage,
    assembled: AssembledResources,
    warnings: &mut Vec<String>,
) -> Vec<ResourceDescriptor> {
    if let Some(warning) = assembled.warning {
        warn(sink, stage, warning.to_string(), warnings);
    }
    assembled.resources
}

fn warn(sink: &dyn ProgressSink, stage: PipelineStage, message: String, warnings: &mut Vec<String>) {
    sink.event(ProgressEvent {
        stage,
        kind: ProgressKind::Warning,
        message: message.clone(),
        elapsed: None,
    });
    warnings.push(message);
}
