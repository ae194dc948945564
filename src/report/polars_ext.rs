use polars::prelude::{Expr, JsonFormat, JsonWriter, PolarsError, SerWriter, lit, when};
use serde_json::Value;

use crate::error::{DataError, IoError, StockGymError, StockGymResult};

pub(super) fn polars_to_stockgym_error(report: &str, e: PolarsError) -> StockGymError {
    StockGymError::Data(DataError::DataFrame(format!(
        "Error while building {report}: {e}"
    )))
}

pub trait ExprExt {
    /// Divides two expressions, returning `fallback` where the denominator is zero.
    fn safe_div(self, other: Expr, fallback: f64) -> Expr;
}

impl ExprExt for Expr {
    fn safe_div(self, other: Expr, fallback: f64) -> Expr {
        when(other.clone().eq(lit(0.0)))
            .then(lit(fallback))
            .otherwise(self / other)
    }
}

pub trait DataFrameExt {
    /// Serializes every row into a JSON object keyed by column name.
    fn to_json_rows(&self) -> StockGymResult<Vec<serde_json::Map<String, Value>>>;
}

impl DataFrameExt for polars::frame::DataFrame {
    fn to_json_rows(&self) -> StockGymResult<Vec<serde_json::Map<String, Value>>> {
        let height = self.height();
        if height == 0 {
            return Ok(Vec::new());
        }

        // Roughly 16 bytes per integer cell.
        let mut buf = Vec::with_capacity(height * self.width() * 16);

        JsonWriter::new(&mut buf)
            .with_json_format(JsonFormat::Json)
            .finish(&mut self.clone())
            .map_err(|e| DataError::DataFrame(e.to_string()))?;

        match serde_json::from_slice(&buf).map_err(IoError::Json)? {
            Value::Array(rows) => Ok(rows
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            _ => Err(DataError::DataFrame("Polars JSON output was not an array".to_string()).into()),
        }
    }
}
