#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use polars::df;
use polars::prelude::ParquetWriter;
use zip::write::SimpleFileOptions;

use ccvi_catalog::config::{Config, ConfigLoader, ResolvedConfig};
use ccvi_catalog::error::CcviError;
use ccvi_catalog::fetch::Fetcher;
use ccvi_catalog::pipeline::{ProgressEvent, ProgressSink};

pub const QTR_URL: &str = "https://example.org/ccvi/latest.zip";
pub const FULL_URL: &str = "https://example.org/ccvi/full.zip";

pub fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

pub fn resolved_config(extra: serde_json::Value) -> ResolvedConfig {
    let mut value = serde_json::json!({
        "qtr_url": QTR_URL,
        "full_url": FULL_URL,
    });
    if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
        for (key, item) in extra {
            base.insert(key.clone(), item.clone());
        }
    }
    let config: Config = serde_json::from_value(value).unwrap();
    ConfigLoader::resolve_config(config).unwrap()
}

pub fn write_zip(path: &Utf8Path, files: &[(&str, Vec<u8>)]) {
    let mut writer = zip::ZipWriter::new(fs::File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

pub fn filler(size: usize) -> Vec<u8> {
    vec![b'x'; size]
}

pub fn parquet_bytes(years: &[i32], quarters: &[i32]) -> Vec<u8> {
    let scores: Vec<f64> = years.iter().map(|_| 0.5).collect();
    let mut frame = df!(
        "year" => years,
        "quarter" => quarters,
        "score" => scores,
    )
    .unwrap();
    let mut bytes = Vec::new();
    ParquetWriter::new(&mut bytes).finish(&mut frame).unwrap();
    bytes
}

/// Rows spanning 2015Q1 through 2025Q2.
pub fn exposure_parquet() -> Vec<u8> {
    parquet_bytes(
        &[2015, 2015, 2019, 2024, 2025, 2025],
        &[3, 1, 2, 4, 2, 1],
    )
}

pub fn quarterly_files(with_readme: bool) -> Vec<(&'static str, Vec<u8>)> {
    let mut files = vec![
        ("ccvi-data-recency.tsv", filler(2000)),
        ("ccvi-structure.tsv", filler(5000)),
        ("ccvi-data-sources.tsv", filler(3000)),
        ("ccvi-latest.tsv", filler(4000)),
    ];
    if with_readme {
        files.insert(2, ("README.md", filler(1000)));
    }
    files
}

pub fn full_files(exposure: Vec<u8>) -> Vec<(&'static str, Vec<u8>)> {
    let size = exposure.len();
    assert!(size > 100, "parquet fixture unexpectedly small");
    vec![
        ("ccvi-data-sources.tsv", filler(20)),
        ("README.md", filler(size + 1000)),
        ("ccvi_scores.parquet", filler(size - 50)),
        ("base_grid.parquet", filler(size - 10)),
        ("ccvi-structure.tsv", filler(40)),
        ("index-full.parquet", filler(size - 40)),
        ("exposure_layers.parquet", exposure),
        ("data_recency.parquet", filler(size - 30)),
        ("vul_country_raw.parquet", filler(size - 20)),
    ]
}

/// Serves fixture archives by URL and records the order of requests.
pub struct FixtureFetcher {
    files: HashMap<String, Utf8PathBuf>,
    pub calls: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new(files: &[(&str, Utf8PathBuf)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(url, path)| (url.to_string(), path.clone()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl Fetcher for FixtureFetcher {
    fn fetch(&self, url: &str, _filename: Option<&str>) -> Result<Utf8PathBuf, CcviError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.files.get(url).cloned().ok_or_else(|| CcviError::Network {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Builds both CCVI fixture archives under `root` and returns their paths.
pub fn ccvi_archives(root: &Utf8Path, with_qtr_readme: bool) -> (Utf8PathBuf, Utf8PathBuf) {
    let fixtures = root.join("fixtures");
    fs::create_dir_all(&fixtures).unwrap();
    let qtr = fixtures.join("latest_data.zip");
    let full = fixtures.join("latest_data_full.zip");
    write_zip(&qtr, &quarterly_files(with_qtr_readme));
    write_zip(&full, &full_files(exposure_parquet()));
    (qtr, full)
}
