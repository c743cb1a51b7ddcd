//! Data preprocessing module
//!
//! Turns raw survey tables into the fixed numeric schema:
//! - Yes/No answers collapse to {0, 1}
//! - Sex collapses to {0, 1} (Female = 1)
//! - Age buckets reduce to their two leading digits
//! - BMI and PhysicalHealth pass through unchanged

mod encoder;

pub use encoder::{
    encode_dataframe, encode_diabetic, encode_record, encode_sex, encode_yes_no, is_integer_feature, parse_age,
    raw_columns, EncodedRecord, FeatureEncoder, RawRecord, DEFAULT_LABEL_COLUMN,
    FEATURE_COLUMNS,
};
