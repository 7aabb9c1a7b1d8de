use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const SERVER_INFO_CALL: &str = "serverinfo";
pub const ALLELE_MATRIX_SERVICE: &str = "allelematrix";
pub const VARIANTS_SERVICE: &str = "variants";

/// Value written for fixed VCF columns that carry no data.
pub const MISSING: &str = ".";

/// Pagination axis of the allele matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Variants,
    CallSets,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Variants => "VARIANTS",
            Dimension::CallSets => "CALLSETS",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the text of failed filters ends up on a data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterColumn {
    Alt,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleId(String);

impl SampleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed columns of one VCF data line, keyed by the BrAPI variant id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariantRecord {
    pub chrom: Option<String>,
    pub pos: Option<i64>,
    pub id: String,
    pub ref_bases: Option<String>,
    pub alt_bases: Option<String>,
    pub qual: Option<String>,
    pub filter: Option<String>,
    pub info: Vec<String>,
}

impl VariantRecord {
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// CHROM through INFO, with `.` for anything unset.
    pub fn fixed_columns(&self) -> [String; 8] {
        [
            text_or_missing(self.chrom.as_deref()),
            self.pos
                .map(|pos| pos.to_string())
                .unwrap_or_else(|| MISSING.to_string()),
            text_or_missing(Some(self.id.as_str())),
            text_or_missing(self.ref_bases.as_deref()),
            text_or_missing(self.alt_bases.as_deref()),
            text_or_missing(self.qual.as_deref()),
            text_or_missing(self.filter.as_deref()),
            if self.info.is_empty() {
                MISSING.to_string()
            } else {
                self.info.join(";")
            },
        ]
    }
}

fn text_or_missing(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => MISSING.to_string(),
    }
}
