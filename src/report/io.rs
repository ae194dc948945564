use std::{fs, path::Path};

use polars::{
    frame::DataFrame,
    prelude::{CsvWriterOptions, IntoLazy, PlPath, SchemaRef, SinkOptions, SinkTarget},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::{DataError, IoError, StockGymResult},
    report::polars_ext::DataFrameExt,
};

// ================================================================================================
// Traits
// ================================================================================================

/// Common interface of every report (journal, training report).
pub trait Report {
    /// Access the underlying DataFrame (Immutable).
    fn as_df(&self) -> &DataFrame;

    /// Access the underlying DataFrame (Mutable).
    fn as_df_mut(&mut self) -> &mut DataFrame;
}

pub trait ReportName {
    fn base_name(&self) -> String;

    fn filename(&self, ext: FileExtension) -> String {
        format!("{}.{}", self.base_name(), ext)
    }
}

pub trait ToSchema {
    /// Returns the canonical schema for this report type.
    fn to_schema() -> SchemaRef;
}

pub trait ToJson {
    /// Serializes the report to a `Value::Array` of row objects.
    fn to_json(&self) -> StockGymResult<Value>;
}

pub trait ToCsv {
    /// Writes the report to `<dir>/<base_name>.csv`.
    ///
    /// Creates `dir` if missing and overwrites an existing file.
    fn to_csv(
        &self,
        dir: impl AsRef<Path>,
        opts: Option<&CsvWriterOptions>,
        sink_opts: Option<&SinkOptions>,
    ) -> StockGymResult<()>;
}

// ================================================================================================
// Blanket Implementations
// ================================================================================================

impl<T> ToJson for T
where
    T: Report,
{
    fn to_json(&self) -> StockGymResult<Value> {
        let rows = self.as_df().to_json_rows()?;
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }
}

impl<T> ToCsv for T
where
    T: Report + ReportName,
{
    fn to_csv(
        &self,
        dir: impl AsRef<Path>,
        opts: Option<&CsvWriterOptions>,
        sink_opts: Option<&SinkOptions>,
    ) -> StockGymResult<()> {
        let dir = dir.as_ref();
        let file_path = dir.join(self.filename(FileExtension::Csv));

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(IoError::from)?;
        }

        let uri = file_path.to_str().ok_or_else(|| {
            IoError::FileSystem(format!(
                "Path contains invalid UTF-8 characters: {}",
                file_path.display()
            ))
        })?;
        let target = SinkTarget::Path(PlPath::new(uri));
        let options = opts.cloned().unwrap_or_default();
        let sink_opts = sink_opts.cloned().unwrap_or_default();

        let sink_plan = self
            .as_df()
            .clone()
            .lazy()
            .sink_csv(target, options, None, sink_opts)
            .map_err(|e| DataError::DataFrame(format!("Failed to build CSV sink plan: {e}")))?;

        let _ = sink_plan.collect().map_err(|e| {
            DataError::DataFrame(format!(
                "Failed to write CSV to '{}': {e}",
                file_path.display()
            ))
        })?;

        tracing::debug!(path = %file_path.display(), "Report written");
        Ok(())
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum FileExtension {
    Csv,
}

#[cfg(test)]
mod tests {
    use polars::{
        df,
        prelude::{LazyCsvReader, LazyFileListReader},
    };

    use super::*;

    struct Plain(DataFrame);

    impl Report for Plain {
        fn as_df(&self) -> &DataFrame {
            &self.0
        }

        fn as_df_mut(&mut self) -> &mut DataFrame {
            &mut self.0
        }
    }

    impl ReportName for Plain {
        fn base_name(&self) -> String {
            "plain".to_string()
        }
    }

    #[test]
    fn filename_uses_extension() {
        let report = Plain(DataFrame::empty());
        assert_eq!(report.filename(FileExtension::Csv), "plain.csv");
    }

    #[test]
    fn csv_round_trip() {
        let report = Plain(
            df![
                "period" => [0i64, 1, 2],
                "reward" => [0i64, 4, -1],
            ]
            .expect("Failed to create DF"),
        );

        let dir = std::env::temp_dir().join(format!("stockgym-report-{}", std::process::id()));
        report.to_csv(&dir, None, None).expect("Failed to write CSV");

        let path = dir.join("plain.csv");
        let read = LazyCsvReader::new(PlPath::new(
            path.to_str().expect("Temp path is not valid UTF-8"),
        ))
        .with_has_header(true)
        .finish()
        .expect("Failed to create LazyFrame from CSV")
        .collect()
        .expect("Failed to collect DataFrame");

        assert!(read.equals(report.as_df()));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn json_is_an_array_of_rows() {
        let report = Plain(df!["reward" => [3i64]].expect("Failed to create DF"));
        let json = report.to_json().expect("Failed to serialize");
        assert_eq!(json, serde_json::json!([{ "reward": 3 }]));
    }
}
