use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::brapi::BrapiClient;
use crate::config::ResolvedConfig;
use crate::domain::{FilterColumn, VARIANTS_SERVICE, VariantRecord};
use crate::error::BrapiError;
use crate::pagination::{PageCounter, metadata_total_pages};

/// Variant id → fixed VCF columns, built from the `variants` call.
#[derive(Debug, Clone, Default)]
pub struct VariantIndex {
    records: HashMap<String, VariantRecord>,
}

impl VariantIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every page of `variants`. Any failed page aborts the whole index.
    pub fn fetch<C: BrapiClient>(
        client: &C,
        config: &ResolvedConfig,
    ) -> Result<Self, BrapiError> {
        let mut index = Self::new();
        let mut pages = PageCounter::new(VARIANTS_SERVICE);
        let mut page = 0usize;
        while pages.has_more(page) {
            let params = [
                ("page", page.to_string()),
                ("pageSize", config.variants_page_size.to_string()),
            ];
            let response = client.get(VARIANTS_SERVICE, &params)?;
            pages.observe(metadata_total_pages(&response))?;
            let added = index.ingest_page(&response, config.failed_filters_column);
            debug!(page, total = pages.total(), added, "variants page");
            page += 1;
        }
        info!(variants = index.len(), "variant metadata indexed");
        Ok(index)
    }

    /// Adds the `result.data` entries of one page and returns how many were
    /// usable.
    pub fn ingest_page(&mut self, response: &Value, filter_column: FilterColumn) -> usize {
        let entries = response
            .get("result")
            .and_then(|value| value.get("data"))
            .and_then(|value| value.as_array());
        let Some(entries) = entries else {
            return 0;
        };
        let mut added = 0usize;
        for entry in entries {
            if let Some(record) = record_from_entry(entry, filter_column) {
                self.insert(record);
                added += 1;
            }
        }
        added
    }

    pub fn insert(&mut self, record: VariantRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, variant_id: &str) -> Option<&VariantRecord> {
        self.records.get(variant_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Builds the fixed columns for one BrAPI variant. Entries without a
/// `variantDbId` are skipped; every other attribute is optional.
pub fn record_from_entry(entry: &Value, filter_column: FilterColumn) -> Option<VariantRecord> {
    let id = entry.get("variantDbId").and_then(scalar_text)?;
    let mut record = VariantRecord::placeholder(id);

    record.chrom = non_empty_text(entry.get("referenceName"))
        .or_else(|| non_empty_text(entry.get("referenceDbId")));
    record.pos = entry.get("start").and_then(|value| value.as_i64());
    record.ref_bases = non_empty_text(entry.get("referenceBases"));
    record.alt_bases = joined(entry.get("alternateBases"), ",");

    if is_true(entry.get("filtersApplied")) {
        if is_true(entry.get("filtersPassed")) {
            record.filter = Some("PASS".to_string());
        } else if let Some(failed) = joined(entry.get("filtersFailed"), ";") {
            match filter_column {
                FilterColumn::Alt => record.alt_bases = Some(failed),
                FilterColumn::Filter => record.filter = Some(failed),
            }
        }
    } else {
        record.filter = Some(".".to_string());
    }

    if let Some(end) = entry.get("end").and_then(|value| value.as_i64()) {
        record.info.push(format!("END={end}"));
    }
    if let Some(svlen) = entry.get("svlen").and_then(|value| value.as_i64()) {
        record.info.push(format!("SVLEN={svlen}"));
    }
    if let Some(cipos) = joined(entry.get("cipos"), ",") {
        record.info.push(format!("CIPOS={cipos}"));
    }
    if let Some(ciend) = joined(entry.get("ciend"), ",") {
        record.info.push(format!("CIEND={ciend}"));
    }
    if let Some(svtype) = non_empty_text(entry.get("variantType")) {
        record.info.push(format!("SVTYPE={svtype}"));
    }

    Some(record)
}

fn is_true(value: Option<&Value>) -> bool {
    value.and_then(|value| value.as_bool()).unwrap_or(false)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(scalar_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn joined(value: Option<&Value>, separator: &str) -> Option<String> {
    let items = value.and_then(|value| value.as_array())?;
    if items.is_empty() {
        return None;
    }
    let parts = items
        .iter()
        .map(|item| scalar_text(item).unwrap_or_else(|| item.to_string()))
        .collect::<Vec<_>>();
    Some(parts.join(separator))
}
