//! Publishing side: merges the derived dataset with static metadata into a
//! catalog record.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::DatasetDescriptor;
use crate::error::CcviError;

const CCVI_NOTES: &str = "The Climate\u{2014}Conflict\u{2014}Vulnerability Index (CCVI) maps current global risks by integrating climate and conflict hazards with local vulnerabilities. The index comprises a harmonized set of data layers and a transparent scoring methodology to make regions globally comparable. The data is updated quarterly and gridded to 0.5 degrees (ca. 55km by 55km at the equator).\n\nThe CCVI metrics are organized hierarchically in three pillars \u{2014} climate, conflict and vulnerability. Each pillar is based on indicators from publicly available sources, which are further grouped into dimensions. Following the IPCC definition, risk metrics are computed as a function of hazards, exposure and vulnerability.\n\nThere are two sets of resources. One smaller set contains only the data from the latest quarter in tsv format, while the full dataset includes historical time series and reference data in parquet format.\n";

/// Catalog fields that are configured rather than derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticMetadata {
    pub caveats: String,
    pub data_update_frequency: u32,
    pub dataset_source: String,
    pub license_id: String,
    pub maintainer: String,
    pub methodology: String,
    pub notes: String,
    pub owner_org: String,
    pub package_creator: String,
    pub private: bool,
    pub subnational: bool,
    pub tag_vocabulary_id: String,
    pub locations: Vec<String>,
}

impl Default for StaticMetadata {
    fn default() -> Self {
        Self {
            caveats: "Please refer to the [CCVI Technical Documentation](https://climate-conflict.org/www/latest-data/docs/) for the full methodology, including limitations.".to_string(),
            data_update_frequency: 90,
            dataset_source: "University of the Bundeswehr Munich; Potsdam Institute for Climate Impact Research".to_string(),
            license_id: "cc-by".to_string(),
            maintainer: "45dc2728-4dfc-4e6a-afa8-2b1a8ed7623b".to_string(),
            methodology: "Direct Observational Data/Anecdotal Data".to_string(),
            notes: CCVI_NOTES.to_string(),
            owner_org: "91b12bfd-0e04-4b43-a33d-9f13bd42d3a8".to_string(),
            package_creator: "HDX Data Systems Team".to_string(),
            private: false,
            subnational: true,
            tag_vocabulary_id: "b891512e-9516-4bf5-962a-7a289772a2a1".to_string(),
            locations: vec!["world".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogTag {
    pub name: String,
    pub vocabulary_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogGroup {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogResource {
    pub name: String,
    pub description: String,
    pub format: String,
    pub file_to_upload: Utf8PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogRecord {
    pub name: String,
    pub title: String,
    pub dataset_date: String,
    pub caveats: String,
    pub data_update_frequency: u32,
    pub dataset_source: String,
    pub license_id: String,
    pub maintainer: String,
    pub methodology: String,
    pub notes: String,
    pub owner_org: String,
    pub package_creator: String,
    pub private: bool,
    pub subnational: String,
    pub groups: Vec<CatalogGroup>,
    pub tags: Vec<CatalogTag>,
    pub resources: Vec<CatalogResource>,
}

impl CatalogRecord {
    pub fn build(dataset: &DatasetDescriptor, metadata: &StaticMetadata) -> Self {
        Self {
            name: dataset.name.clone(),
            title: dataset.title.clone(),
            dataset_date: dataset.time_period.to_string(),
            caveats: metadata.caveats.clone(),
            data_update_frequency: metadata.data_update_frequency,
            dataset_source: metadata.dataset_source.clone(),
            license_id: metadata.license_id.clone(),
            maintainer: metadata.maintainer.clone(),
            methodology: metadata.methodology.clone(),
            notes: metadata.notes.clone(),
            owner_org: metadata.owner_org.clone(),
            package_creator: metadata.package_creator.clone(),
            private: metadata.private,
            subnational: if metadata.subnational { "1" } else { "0" }.to_string(),
            groups: metadata
                .locations
                .iter()
                .map(|name| CatalogGroup { name: name.clone() })
                .collect(),
            tags: dataset
                .tags
                .iter()
                .map(|name| CatalogTag {
                    name: name.clone(),
                    vocabulary_id: metadata.tag_vocabulary_id.clone(),
                })
                .collect(),
            resources: dataset
                .resources
                .iter()
                .map(|resource| CatalogResource {
                    name: resource.name.clone(),
                    description: resource.description.clone(),
                    format: resource.format.clone(),
                    file_to_upload: resource.source_path.clone(),
                })
                .collect(),
        }
    }
}

pub trait CatalogSink {
    fn publish(
        &self,
        dataset: &DatasetDescriptor,
        metadata: &StaticMetadata,
    ) -> Result<(), CcviError>;
}

/// Writes the catalog record as pretty JSON.
#[derive(Debug, Clone)]
pub struct JsonCatalogSink {
    path: Utf8PathBuf,
}

impl JsonCatalogSink {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl CatalogSink for JsonCatalogSink {
    fn publish(
        &self,
        dataset: &DatasetDescriptor,
        metadata: &StaticMetadata,
    ) -> Result<(), CcviError> {
        let record = CatalogRecord::build(dataset, metadata);
        if let Some(parent) = self.path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| CcviError::Filesystem(err.to_string()))?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(&record)
            .map_err(|err| CcviError::Filesystem(err.to_string()))?;
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| CcviError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), self.path.as_std_path())
            .map_err(|err| CcviError::Filesystem(err.to_string()))?;
        tracing::info!(path = %self.path, resources = record.resources.len(), "wrote catalog record");
        Ok(())
    }
}
