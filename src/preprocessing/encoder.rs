//! Survey field encoding
//!
//! Maps raw survey answers onto the fixed numeric schema. Every rule is a
//! pure function; batch encoding fails on the first malformed row.

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Affirmative token for yes/no answers
pub const YES: &str = "Yes";
/// Prefix marking any affirmative diabetic answer ("Yes", "Yes (during pregnancy)")
pub const DIABETIC_YES_PREFIX: &str = "Ye";
/// Token encoded as 1 for the sex field
pub const FEMALE: &str = "Female";

/// Source columns of the raw survey table
pub mod raw_columns {
    pub const BMI: &str = "BMI";
    pub const SMOKING: &str = "Smoking";
    pub const STROKE: &str = "Stroke";
    pub const PHYSICAL_HEALTH: &str = "PhysicalHealth";
    pub const SEX: &str = "Sex";
    pub const AGE_CATEGORY: &str = "AgeCategory";
    pub const DIABETIC: &str = "Diabetic";
    pub const KIDNEY_DISEASE: &str = "KidneyDisease";
}

/// Feature columns of the encoded table, in schema order (label excluded)
pub const FEATURE_COLUMNS: [&str; 8] = [
    "BMI",
    "Smoking",
    "Stroke",
    "PhysicalHealth",
    "Sex",
    "Age",
    "Diabetic",
    "KidneyDisease",
];

/// Default label column
pub const DEFAULT_LABEL_COLUMN: &str = "HeartDisease";

/// Whether an encoded feature column holds integer values
pub fn is_integer_feature(column: &str) -> bool {
    !matches!(column, "BMI" | "PhysicalHealth")
}

/// One unprocessed survey row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub bmi: f64,
    pub smoking: String,
    pub stroke: String,
    pub physical_health: f64,
    pub sex: String,
    pub age_category: String,
    pub diabetic: String,
    pub kidney_disease: String,
    pub heart_disease: String,
}

/// Fixed-schema numeric vector derived from a [`RawRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodedRecord {
    pub bmi: f64,
    pub smoking: u8,
    pub stroke: u8,
    pub physical_health: f64,
    pub sex: u8,
    pub age: i64,
    pub diabetic: u8,
    pub kidney_disease: u8,
    pub label: u8,
}

impl EncodedRecord {
    /// Feature values in schema order, label excluded
    pub fn features(&self) -> [f64; 8] {
        [
            self.bmi,
            self.smoking as f64,
            self.stroke as f64,
            self.physical_health,
            self.sex as f64,
            self.age as f64,
            self.diabetic as f64,
            self.kidney_disease as f64,
        ]
    }

    /// Full row in schema order, label last
    pub fn to_vec(&self) -> Vec<f64> {
        let mut row = self.features().to_vec();
        row.push(self.label as f64);
        row
    }
}

/// 1 if the answer is exactly the affirmative token
pub fn encode_yes_no(value: &str) -> u8 {
    u8::from(value == YES)
}

/// 1 for any answer starting with the affirmative prefix
pub fn encode_diabetic(value: &str) -> u8 {
    u8::from(value.starts_with(DIABETIC_YES_PREFIX))
}

/// Female is 1; male and anything else is 0
pub fn encode_sex(value: &str) -> u8 {
    u8::from(value == FEMALE)
}

/// Age bucket label to its lower bound: "55-59" -> 55, "80 or older" -> 80
pub fn parse_age(bucket: &str) -> std::result::Result<i64, String> {
    let mut chars = bucket.chars();
    let (first, second) = match (chars.next(), chars.next()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(format!("age bucket {:?} is shorter than 2 characters", bucket)),
    };
    match (first.to_digit(10), second.to_digit(10)) {
        (Some(tens), Some(ones)) => Ok((tens * 10 + ones) as i64),
        _ => Err(format!("age bucket {:?} does not start with two digits", bucket)),
    }
}

/// Encode a single record
pub fn encode_record(record: &RawRecord) -> Result<EncodedRecord> {
    let age = parse_age(&record.age_category).map_err(|reason| PipelineError::MalformedInput {
        column: raw_columns::AGE_CATEGORY.to_string(),
        row: None,
        reason,
    })?;

    Ok(EncodedRecord {
        bmi: record.bmi,
        smoking: encode_yes_no(&record.smoking),
        stroke: encode_yes_no(&record.stroke),
        physical_health: record.physical_health,
        sex: encode_sex(&record.sex),
        age,
        diabetic: encode_diabetic(&record.diabetic),
        kidney_disease: encode_yes_no(&record.kidney_disease),
        label: encode_yes_no(&record.heart_disease),
    })
}

/// Batch encoder over a raw survey table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEncoder {
    label_column: String,
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_COLUMN)
    }
}

impl FeatureEncoder {
    /// Create an encoder reading and writing the given label column
    pub fn new(label_column: impl Into<String>) -> Self {
        Self {
            label_column: label_column.into(),
        }
    }

    /// Label column name
    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Header of the encoded table
    pub fn output_columns(&self) -> Vec<String> {
        FEATURE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(std::iter::once(self.label_column.clone()))
            .collect()
    }

    /// Encode a whole table; the first malformed row aborts the batch
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        info!(rows = df.height(), "Encoding survey table");

        let bmi = numeric_column(df, raw_columns::BMI)?;
        let physical_health = numeric_column(df, raw_columns::PHYSICAL_HEALTH)?;
        let smoking = string_column(df, raw_columns::SMOKING)?;
        let stroke = string_column(df, raw_columns::STROKE)?;
        let sex = string_column(df, raw_columns::SEX)?;
        let age_category = string_column(df, raw_columns::AGE_CATEGORY)?;
        let diabetic = string_column(df, raw_columns::DIABETIC)?;
        let kidney = string_column(df, raw_columns::KIDNEY_DISEASE)?;
        let label = string_column(df, &self.label_column)?;

        let ages: Vec<i64> = age_category
            .iter()
            .enumerate()
            .map(|(row, bucket)| {
                let bucket = bucket.as_deref().ok_or_else(|| {
                    PipelineError::malformed(raw_columns::AGE_CATEGORY, row, "missing value")
                })?;
                parse_age(bucket)
                    .map_err(|reason| PipelineError::malformed(raw_columns::AGE_CATEGORY, row, reason))
            })
            .collect::<Result<_>>()?;

        let unrecognized = count_unrecognized(&[&smoking, &stroke, &kidney, &label], &[YES, "No"])
            + count_unrecognized(&[&sex], &[FEMALE, "Male"]);
        if unrecognized > 0 {
            debug!(
                unrecognized,
                "Categorical values outside the known tokens were encoded as 0"
            );
        }

        let columns: Vec<Column> = vec![
            Series::new(FEATURE_COLUMNS[0].into(), bmi).into(),
            Series::new(FEATURE_COLUMNS[1].into(), encode_all(&smoking, encode_yes_no)).into(),
            Series::new(FEATURE_COLUMNS[2].into(), encode_all(&stroke, encode_yes_no)).into(),
            Series::new(FEATURE_COLUMNS[3].into(), physical_health).into(),
            Series::new(FEATURE_COLUMNS[4].into(), encode_all(&sex, encode_sex)).into(),
            Series::new(FEATURE_COLUMNS[5].into(), ages).into(),
            Series::new(FEATURE_COLUMNS[6].into(), encode_all(&diabetic, encode_diabetic)).into(),
            Series::new(FEATURE_COLUMNS[7].into(), encode_all(&kidney, encode_yes_no)).into(),
            Series::new(self.label_column.as_str().into(), encode_all(&label, encode_yes_no)).into(),
        ];

        let encoded = DataFrame::new(columns)?;
        info!(rows = encoded.height(), columns = encoded.width(), "Dataset encoded");
        Ok(encoded)
    }
}

/// Encode a raw survey table with the given label column
pub fn encode_dataframe(df: &DataFrame, label_column: &str) -> Result<DataFrame> {
    FeatureEncoder::new(label_column).transform(df)
}

fn missing_column(column: &str) -> PipelineError {
    PipelineError::MalformedInput {
        column: column.to_string(),
        row: None,
        reason: "required column not found".to_string(),
    }
}

/// Read a column as strings; nulls stay `None`
fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name).map_err(|_| missing_column(name))?;
    let as_str = column.cast(&DataType::String)?;
    let values = as_str
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

/// Read a column as f64; nulls and unparseable values are malformed rows
fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name).map_err(|_| missing_column(name))?;
    let as_f64 = column.cast(&DataType::Float64)?;
    as_f64
        .as_materialized_series()
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| PipelineError::malformed(name, row, "not a number")))
        .collect()
}

fn encode_all(values: &[Option<String>], rule: fn(&str) -> u8) -> Vec<i64> {
    values
        .iter()
        .map(|v| rule(v.as_deref().unwrap_or_default()) as i64)
        .collect()
}

fn count_unrecognized(columns: &[&Vec<Option<String>>], known: &[&str]) -> usize {
    columns
        .iter()
        .flat_map(|c| c.iter())
        .filter(|v| !v.as_deref().map_or(false, |s| known.contains(&s)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(age: &str) -> RawRecord {
        RawRecord {
            bmi: 28.5,
            smoking: "No".to_string(),
            stroke: "No".to_string(),
            physical_health: 3.0,
            sex: "Female".to_string(),
            age_category: age.to_string(),
            diabetic: "No".to_string(),
            kidney_disease: "No".to_string(),
            heart_disease: "No".to_string(),
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let encoded = encode_record(&raw("55-59")).unwrap();
        assert_eq!(encoded.to_vec(), vec![28.5, 0.0, 0.0, 3.0, 1.0, 55.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_age_parse() {
        assert_eq!(parse_age("55-59").unwrap(), 55);
        assert_eq!(parse_age("80 or older").unwrap(), 80);
        assert!(parse_age("8").is_err());
        assert!(parse_age("").is_err());
        assert!(parse_age("a5-59").is_err());
    }

    #[test]
    fn test_short_age_bucket_is_malformed() {
        let err = encode_record(&raw("5")).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { ref column, .. } if column == "AgeCategory"));
    }

    #[test]
    fn test_binary_collapse() {
        assert_eq!(encode_yes_no("Yes"), 1);
        for other in ["No", "yes", "YES", " Yes", "", "Y", "maybe"] {
            assert_eq!(encode_yes_no(other), 0, "{:?} should encode to 0", other);
        }
        assert_eq!(encode_diabetic("Yes (during pregnancy)"), 1);
        assert_eq!(encode_diabetic("No, borderline diabetes"), 0);
        assert_eq!(encode_sex("Female"), 1);
        assert_eq!(encode_sex("Male"), 0);
        assert_eq!(encode_sex("unknown"), 0);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let record = raw("70-74");
        assert_eq!(encode_record(&record).unwrap(), encode_record(&record).unwrap());
    }

    #[test]
    fn test_integer_feature_flags() {
        assert!(!is_integer_feature("BMI"));
        assert!(!is_integer_feature("PhysicalHealth"));
        assert!(is_integer_feature("Age"));
        assert!(is_integer_feature("Smoking"));
    }
}
