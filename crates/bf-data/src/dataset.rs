//! Arrow-backed tabular datasets.
//!
//! A [`TabularDataset`] is a single [`RecordBatch`] plus the name of the label
//! column. Every other column is a feature, in schema order. The label column
//! is optional so that prediction-only tables can share the type.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, UInt32Array};
use arrow::compute::{cast, take_record_batch};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use bf_types::{BfResult, DataError};

/// Dense row-major feature values handed to the booster.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// `num_rows * feature_names.len()` values, row after row.
    pub values: Vec<f32>,
    pub num_rows: usize,
    pub feature_names: Vec<String>,
}

impl FeatureMatrix {
    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Feature values of a single row.
    pub fn row(&self, index: usize) -> &[f32] {
        let width = self.num_features();
        &self.values[index * width..(index + 1) * width]
    }
}

/// A table of numeric feature columns plus one designated label column.
#[derive(Debug, Clone)]
pub struct TabularDataset {
    batch: RecordBatch,
    label: String,
}

impl TabularDataset {
    /// Wrap a record batch. All columns must be numeric; the label column may
    /// be absent for tables that are only used for prediction.
    pub fn new(batch: RecordBatch, label: impl Into<String>) -> BfResult<Self> {
        for field in batch.schema().fields() {
            if !field.data_type().is_numeric() {
                return Err(DataError::NonNumericColumn {
                    column: field.name().clone(),
                    data_type: field.data_type().to_string(),
                }
                .into());
            }
        }

        Ok(Self {
            batch,
            label: label.into(),
        })
    }

    /// Build a dataset from named `f64` columns of equal length.
    pub fn from_columns(
        label: impl Into<String>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> BfResult<Self> {
        let expected = columns.first().map(|(_, values)| values.len()).unwrap_or(0);

        let mut fields = Vec::with_capacity(columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            if values.len() != expected {
                return Err(DataError::LengthMismatch {
                    column: name,
                    expected,
                    actual: values.len(),
                }
                .into());
            }
            fields.push(Field::new(name, DataType::Float64, true));
            arrays.push(Arc::new(Float64Array::from(values)));
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(arrow_error)?;
        Self::new(batch, label)
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn has_label(&self) -> bool {
        self.batch.column_by_name(&self.label).is_some()
    }

    /// Names of every non-label column, in schema order.
    pub fn feature_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .filter(|field| field.name() != &self.label)
            .map(|field| field.name().clone())
            .collect()
    }

    /// Label values as `f32`. Fails if the table has no label column.
    pub fn labels(&self) -> BfResult<Vec<f32>> {
        let column = self
            .batch
            .column_by_name(&self.label)
            .ok_or_else(|| DataError::LabelNotFound {
                label: self.label.clone(),
            })?;
        column_as_f32(&self.label, column)
    }

    /// Row-major matrix of all feature columns; the label column never appears.
    pub fn feature_matrix(&self) -> BfResult<FeatureMatrix> {
        let feature_names = self.feature_names();
        let num_rows = self.num_rows();

        let mut columns = Vec::with_capacity(feature_names.len());
        for name in &feature_names {
            let column = self
                .batch
                .column_by_name(name)
                .ok_or_else(|| DataError::Arrow {
                    message: format!("column {name} disappeared from batch"),
                })?;
            columns.push(column_as_f32(name, column)?);
        }

        let mut values = Vec::with_capacity(num_rows * columns.len());
        for row in 0..num_rows {
            values.extend(columns.iter().map(|column| column[row]));
        }

        Ok(FeatureMatrix {
            values,
            num_rows,
            feature_names,
        })
    }

    /// Copy of this table with the label column dropped.
    pub fn without_label(&self) -> BfResult<Self> {
        let schema = self.batch.schema();
        let keep: Vec<usize> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| field.name() != &self.label)
            .map(|(i, _)| i)
            .collect();

        let batch = self.batch.project(&keep).map_err(arrow_error)?;
        Ok(Self {
            batch,
            label: self.label.clone(),
        })
    }

    /// Shuffle rows with `seed` and split them into disjoint train and eval
    /// partitions. `eval_fraction` must lie strictly between 0 and 1.
    pub fn train_eval_split(&self, eval_fraction: f64, seed: u64) -> BfResult<(Self, Self)> {
        if !(eval_fraction > 0.0 && eval_fraction < 1.0) {
            return Err(DataError::InvalidSplit {
                message: format!("eval fraction {eval_fraction} outside (0, 1)"),
            }
            .into());
        }

        let rows = self.num_rows();
        if rows < 2 {
            return Err(DataError::InvalidSplit {
                message: format!("cannot split {rows} rows"),
            }
            .into());
        }

        let mut indices: Vec<u32> = (0..rows as u32).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let eval_rows = ((rows as f64 * eval_fraction).round() as usize).clamp(1, rows - 1);
        let (eval_idx, train_idx) = indices.split_at(eval_rows);

        let train = self.take_rows(train_idx)?;
        let eval = self.take_rows(eval_idx)?;
        tracing::debug!(
            "Split {} rows into {} train / {} eval",
            rows,
            train.num_rows(),
            eval.num_rows()
        );
        Ok((train, eval))
    }

    fn take_rows(&self, indices: &[u32]) -> BfResult<Self> {
        let indices = UInt32Array::from(indices.to_vec());
        let batch = take_record_batch(&self.batch, &indices).map_err(arrow_error)?;
        Ok(Self {
            batch,
            label: self.label.clone(),
        })
    }
}

/// Cast any numeric column to `f32`; nulls become `NaN` (XGBoost's missing value).
fn column_as_f32(name: &str, column: &ArrayRef) -> BfResult<Vec<f32>> {
    let casted = cast(column, &DataType::Float32).map_err(arrow_error)?;
    let values = casted
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| DataError::NonNumericColumn {
            column: name.to_string(),
            data_type: column.data_type().to_string(),
        })?;

    Ok((0..values.len())
        .map(|i| {
            if values.is_null(i) {
                f32::NAN
            } else {
                values.value(i)
            }
        })
        .collect())
}

pub(crate) fn arrow_error(err: arrow::error::ArrowError) -> DataError {
    DataError::Arrow {
        message: err.to_string(),
    }
}
