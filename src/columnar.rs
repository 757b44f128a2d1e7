use std::collections::BTreeMap;
use std::fs::File;

use camino::Utf8Path;
use polars::prelude::*;

use crate::error::CcviError;

pub trait ColumnarReader: Send + Sync {
    /// Reads only `columns`, each as a non-null integer sequence.
    fn read_columns(
        &self,
        path: &Utf8Path,
        columns: &[&str],
    ) -> Result<BTreeMap<String, Vec<i64>>, CcviError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetColumnReader;

impl ColumnarReader for ParquetColumnReader {
    fn read_columns(
        &self,
        path: &Utf8Path,
        columns: &[&str],
    ) -> Result<BTreeMap<String, Vec<i64>>, CcviError> {
        let file = File::open(path.as_std_path())
            .map_err(|err| CcviError::Filesystem(format!("open {path}: {err}")))?;
        let projection = columns.iter().map(|name| name.to_string()).collect();
        let frame = ParquetReader::new(file)
            .with_columns(Some(projection))
            .finish()
            .map_err(|err| malformed(path, err.to_string()))?;

        let mut out = BTreeMap::new();
        for name in columns {
            let column = frame
                .column(name)
                .map_err(|_| malformed(path, format!("column {name} is missing")))?;
            if !column.dtype().is_integer() {
                return Err(malformed(
                    path,
                    format!("column {name} has type {}, expected integers", column.dtype()),
                ));
            }
            let widened = column
                .as_materialized_series()
                .cast(&DataType::Int64)
                .map_err(|err| malformed(path, err.to_string()))?;
            let values = widened
                .i64()
                .map_err(|err| malformed(path, err.to_string()))?;
            if values.null_count() > 0 {
                return Err(malformed(
                    path,
                    format!("column {name} contains {} null values", values.null_count()),
                ));
            }
            out.insert(name.to_string(), values.into_no_null_iter().collect());
        }
        tracing::debug!(%path, rows = frame.height(), "read columnar projection");
        Ok(out)
    }
}

fn malformed(path: &Utf8Path, message: String) -> CcviError {
    CcviError::MalformedData {
        path: path.to_string(),
        message,
    }
}
