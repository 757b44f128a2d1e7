//! Resource naming, descriptions and ordering per archive.

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{ArchiveEntry, ArchiveKind, AssemblyStrategy, FileRole, ResourceDescriptor};
use crate::error::CcviError;

pub const QUARTERLY_DOC_DESCRIPTION: &str = "File structures of last quarter dataset.";
pub const QUARTERLY_DATA_DESCRIPTION: &str =
    "Dataset covers only the latest quarter. See LAST_QTR_README.md for file structure.";
pub const FULL_DOC_DESCRIPTION: &str = "File structures of full dataset.";
pub const FULL_DATA_DESCRIPTION: &str = "Full dataset including historical time series and reference data. See FULL_README.md for file structure.";

const STRUCTURE_DOC_FORMAT: &str = "txt";
const ARCHIVE_FORMAT: &str = "zip";

/// An archive member after classification and extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub entry: ArchiveEntry,
    pub role: FileRole,
    pub local_path: Utf8PathBuf,
}

/// One downloaded archive and the members extracted from it, in extraction order.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveBundle<'a> {
    pub kind: ArchiveKind,
    pub archive_path: &'a Utf8Path,
    pub entries: &'a [ExtractedEntry],
    /// Whether the archive listing held a structure doc, extracted or not.
    pub has_structure_doc: bool,
}

impl ArchiveBundle<'_> {
    fn missing_doc_warning(&self) -> Option<CcviError> {
        (!self.has_structure_doc).then_some(CcviError::MissingStructureDoc {
            archive: self.kind,
        })
    }
}

#[derive(Debug)]
pub struct AssembledResources {
    pub resources: Vec<ResourceDescriptor>,
    /// Set when the archive had no structure doc; the other resources are kept.
    pub warning: Option<CcviError>,
}

pub trait ResourceAssembler: Send + Sync {
    fn assemble(&self, bundle: ArchiveBundle<'_>) -> AssembledResources;

    /// Whether every member must be extracted, or only the primary time series.
    fn extracts_members(&self) -> bool;
}

impl AssemblyStrategy {
    pub fn assembler(&self) -> Box<dyn ResourceAssembler> {
        match self {
            AssemblyStrategy::Full => Box::new(FullListingAssembler),
            AssemblyStrategy::Summary => Box::new(SummaryAssembler),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FullListingAssembler;

impl ResourceAssembler for FullListingAssembler {
    fn assemble(&self, bundle: ArchiveBundle<'_>) -> AssembledResources {
        let (docs, data): (Vec<&ExtractedEntry>, Vec<&ExtractedEntry>) = bundle
            .entries
            .iter()
            .partition(|item| item.role == FileRole::StructureDoc);

        let data = match bundle.kind {
            ArchiveKind::Quarterly => data,
            ArchiveKind::Full => {
                let (columnar, rest): (Vec<_>, Vec<_>) = data.into_iter().partition(|item| {
                    item.role == FileRole::PrimaryTimeSeries || item.entry.is_columnar()
                });
                columnar.into_iter().chain(rest).collect()
            }
        };

        let mut resources: Vec<ResourceDescriptor> = data
            .into_iter()
            .map(|item| data_resource(bundle.kind, item))
            .collect();
        resources.extend(docs.iter().map(|item| doc_resource(bundle.kind, item)));

        AssembledResources {
            resources,
            warning: bundle.missing_doc_warning(),
        }
    }

    fn extracts_members(&self) -> bool {
        true
    }
}

/// Publishes each archive as a single resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryAssembler;

impl ResourceAssembler for SummaryAssembler {
    fn assemble(&self, bundle: ArchiveBundle<'_>) -> AssembledResources {
        let filename = bundle
            .archive_path
            .file_name()
            .unwrap_or(bundle.archive_path.as_str());
        let (name, description) = match bundle.kind {
            ArchiveKind::Quarterly => (
                format!("last_qtr_{filename}"),
                QUARTERLY_DATA_DESCRIPTION,
            ),
            ArchiveKind::Full => (filename.to_string(), FULL_DATA_DESCRIPTION),
        };
        AssembledResources {
            resources: vec![ResourceDescriptor {
                name,
                description: description.to_string(),
                format: ARCHIVE_FORMAT.to_string(),
                source_path: bundle.archive_path.to_path_buf(),
            }],
            warning: bundle.missing_doc_warning(),
        }
    }

    fn extracts_members(&self) -> bool {
        false
    }
}

fn data_resource(kind: ArchiveKind, item: &ExtractedEntry) -> ResourceDescriptor {
    let (name, description) = match kind {
        ArchiveKind::Quarterly => (
            format!("last_qtr_{}", item.entry.filename),
            QUARTERLY_DATA_DESCRIPTION,
        ),
        ArchiveKind::Full => (item.entry.filename.clone(), FULL_DATA_DESCRIPTION),
    };
    ResourceDescriptor {
        name,
        description: description.to_string(),
        format: item.entry.format(),
        source_path: item.local_path.clone(),
    }
}

fn doc_resource(kind: ArchiveKind, item: &ExtractedEntry) -> ResourceDescriptor {
    let (name, description) = match kind {
        ArchiveKind::Quarterly => (
            format!("LAST_QTR_{}", item.entry.filename),
            QUARTERLY_DOC_DESCRIPTION,
        ),
        ArchiveKind::Full => (
            format!("FULL_{}", item.entry.filename),
            FULL_DOC_DESCRIPTION,
        ),
    };
    ResourceDescriptor {
        name,
        description: description.to_string(),
        format: STRUCTURE_DOC_FORMAT.to_string(),
        source_path: item.local_path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn extracted(name: &str, size: u64, role: FileRole) -> ExtractedEntry {
        ExtractedEntry {
            entry: ArchiveEntry::new(name, size),
            role,
            local_path: Utf8PathBuf::from("/work").join(name),
        }
    }

    fn names(resources: &[ResourceDescriptor]) -> Vec<&str> {
        resources.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn quarterly_doc_goes_last() {
        let entries = vec![
            extracted("a.tsv", 900, FileRole::Payload),
            extracted("README.md", 500, FileRole::StructureDoc),
            extracted("b.tsv", 300, FileRole::Payload),
        ];
        let assembled = FullListingAssembler.assemble(ArchiveBundle {
            kind: ArchiveKind::Quarterly,
            archive_path: Utf8Path::new("/work/latest_data.zip"),
            entries: &entries,
            has_structure_doc: true,
        });
        assert_eq!(
            names(&assembled.resources),
            vec!["last_qtr_a.tsv", "last_qtr_b.tsv", "LAST_QTR_README.md"]
        );
        assert!(assembled.warning.is_none());

        let doc = &assembled.resources[2];
        assert_eq!(doc.format, "txt");
        assert_eq!(doc.description, QUARTERLY_DOC_DESCRIPTION);
        assert_eq!(doc.source_path, Utf8PathBuf::from("/work/README.md"));
        assert_eq!(assembled.resources[0].format, "tsv");
        assert_eq!(assembled.resources[0].description, QUARTERLY_DATA_DESCRIPTION);
    }

    #[test]
    fn full_puts_columnar_files_first() {
        let entries = vec![
            extracted("ccvi-structure.tsv", 1000, FileRole::Payload),
            extracted("exposure_layers.parquet", 800, FileRole::PrimaryTimeSeries),
            extracted("README.md", 700, FileRole::StructureDoc),
            extracted("base_grid.parquet", 600, FileRole::Payload),
            extracted("ccvi-data-sources.tsv", 10, FileRole::Payload),
        ];
        let assembled = FullListingAssembler.assemble(ArchiveBundle {
            kind: ArchiveKind::Full,
            archive_path: Utf8Path::new("/work/latest_data_full.zip"),
            entries: &entries,
            has_structure_doc: true,
        });
        assert_eq!(
            names(&assembled.resources),
            vec![
                "exposure_layers.parquet",
                "base_grid.parquet",
                "ccvi-structure.tsv",
                "ccvi-data-sources.tsv",
                "FULL_README.md",
            ]
        );
        assert_eq!(assembled.resources[0].description, FULL_DATA_DESCRIPTION);
        assert_eq!(assembled.resources[0].format, "parquet");
        assert_eq!(assembled.resources[4].description, FULL_DOC_DESCRIPTION);
    }

    #[test]
    fn quarterly_does_not_group_by_format() {
        let entries = vec![
            extracted("big.tsv", 900, FileRole::Payload),
            extracted("small.parquet", 100, FileRole::Payload),
        ];
        let assembled = FullListingAssembler.assemble(ArchiveBundle {
            kind: ArchiveKind::Quarterly,
            archive_path: Utf8Path::new("/work/latest_data.zip"),
            entries: &entries,
            has_structure_doc: true,
        });
        assert_eq!(
            names(&assembled.resources),
            vec!["last_qtr_big.tsv", "last_qtr_small.parquet"]
        );
    }

    #[test]
    fn missing_doc_is_a_warning() {
        let entries = vec![extracted("a.tsv", 1, FileRole::Payload)];
        let assembled = FullListingAssembler.assemble(ArchiveBundle {
            kind: ArchiveKind::Full,
            archive_path: Utf8Path::new("/work/latest_data_full.zip"),
            entries: &entries,
            has_structure_doc: false,
        });
        assert_eq!(names(&assembled.resources), vec!["a.tsv"]);
        assert_matches!(
            assembled.warning,
            Some(CcviError::MissingStructureDoc {
                archive: ArchiveKind::Full
            })
        );
    }

    #[test]
    fn summary_publishes_the_archive() {
        let quarterly = SummaryAssembler.assemble(ArchiveBundle {
            kind: ArchiveKind::Quarterly,
            archive_path: Utf8Path::new("/work/latest_data.zip"),
            entries: &[],
            has_structure_doc: true,
        });
        assert_eq!(names(&quarterly.resources), vec!["last_qtr_latest_data.zip"]);
        assert_eq!(quarterly.resources[0].description, QUARTERLY_DATA_DESCRIPTION);
        assert!(quarterly.warning.is_none());

        let full = SummaryAssembler.assemble(ArchiveBundle {
            kind: ArchiveKind::Full,
            archive_path: Utf8Path::new("/work/latest_data_full.zip"),
            entries: &[],
            has_structure_doc: true,
        });
        assert_eq!(full.resources.len(), 1);
        let resource = &full.resources[0];
        assert_eq!(resource.name, "latest_data_full.zip");
        assert_eq!(resource.format, "zip");
        assert_eq!(resource.description, FULL_DATA_DESCRIPTION);
        assert_eq!(resource.source_path, Utf8PathBuf::from("/work/latest_data_full.zip"));
        assert!(!SummaryAssembler.extracts_members());
    }

    #[test]
    fn summary_still_reports_missing_doc() {
        let assembled = SummaryAssembler.assemble(ArchiveBundle {
            kind: ArchiveKind::Quarterly,
            archive_path: Utf8Path::new("/work/latest_data.zip"),
            entries: &[],
            has_structure_doc: false,
        });
        assert_eq!(assembled.resources.len(), 1);
        assert_matches!(
            assembled.warning,
            Some(CcviError::MissingStructureDoc {
                archive: ArchiveKind::Quarterly
            })
        );
    }
}
