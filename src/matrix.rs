use serde_json::Value;
use tracing::{debug, info};

use crate::brapi::BrapiClient;
use crate::config::ResolvedConfig;
use crate::domain::{ALLELE_MATRIX_SERVICE, Dimension, SampleId, VariantRecord};
use crate::error::BrapiError;
use crate::pagination::{PageCounter, dimension_total_pages};
use crate::variants::VariantIndex;

/// A per-sample data field as declared in a `##FORMAT` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatField {
    pub id: String,
    pub data_type: String,
    pub description: String,
}

/// Every FORMAT field seen during the run, in discovery order. Lives for the
/// whole run while rows are rebuilt per variant page.
#[derive(Debug, Clone, Default)]
pub struct FormatCatalog {
    fields: Vec<FormatField>,
}

impl FormatCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the abbreviation is already known.
    pub fn register(&mut self, field: FormatField) -> bool {
        if self.contains(&field.id) {
            return false;
        }
        self.fields.push(field);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.fields.iter().any(|field| field.id == id)
    }

    pub fn fields(&self) -> &[FormatField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One variant line under construction: the fixed columns plus, for every
/// sample column, one value per active FORMAT field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixRow {
    pub record: VariantRecord,
    pub format: Vec<String>,
    pub samples: Vec<Vec<String>>,
}

impl MatrixRow {
    pub fn new(record: VariantRecord) -> Self {
        Self {
            record,
            format: Vec::new(),
            samples: Vec::new(),
        }
    }

    /// Activates a field and backfills every existing sample column.
    pub fn add_field(&mut self, id: &str, placeholder: &str) {
        self.format.push(id.to_string());
        for values in &mut self.samples {
            values.push(placeholder.to_string());
        }
    }

    pub fn add_samples(&mut self, count: usize, placeholder: &str) {
        for _ in 0..count {
            self.samples
                .push(vec![placeholder.to_string(); self.format.len()]);
        }
    }

    pub fn format_column(&self) -> String {
        self.format.join(":")
    }

    pub fn sample_column(&self, sample: usize) -> Option<String> {
        self.samples.get(sample).map(|values| values.join(":"))
    }
}

/// Rows of one variant page after all of its call-set pages were read.
#[derive(Debug, Clone)]
pub struct MatrixPage {
    pub index: usize,
    pub samples: Vec<SampleId>,
    pub rows: Vec<MatrixRow>,
}

/// Accumulates the call-set pages of a single variant page.
#[derive(Debug, Default)]
pub struct PageBuilder {
    placeholder: String,
    fields: Vec<String>,
    samples: Vec<SampleId>,
    rows: Vec<MatrixRow>,
}

impl PageBuilder {
    pub fn new(placeholder: &str) -> Self {
        Self {
            placeholder: placeholder.to_string(),
            ..Self::default()
        }
    }

    /// Seeds one row per variant id, from the index when it knows the id.
    pub fn start_rows(&mut self, variant_ids: &[String], index: Option<&VariantIndex>) {
        self.rows = variant_ids
            .iter()
            .map(|id| {
                let record = index
                    .and_then(|index| index.get(id))
                    .cloned()
                    .unwrap_or_else(|| VariantRecord::placeholder(id.clone()));
                MatrixRow::new(record)
            })
            .collect();
    }

    /// Folds one allele-matrix response into the rows: new fields first, then
    /// the new sample columns, then the values.
    pub fn apply(&mut self, response: &Value, catalog: &mut FormatCatalog) -> Result<(), BrapiError> {
        let result = response.get("result");
        let blocks = result
            .and_then(|value| value.get("dataMatrices"))
            .and_then(|value| value.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        for block in blocks {
            let Some(id) = block_abbreviation(block) else {
                continue;
            };
            if self.fields.iter().any(|field| field == id) {
                continue;
            }
            self.fields.push(id.to_string());
            for row in &mut self.rows {
                row.add_field(id, &self.placeholder);
            }
            if catalog.register(format_field(block, id)) {
                debug!(field = id, "new FORMAT field");
            }
        }

        let page_samples = string_list(result.and_then(|value| value.get("callSetDbIds")));
        let offset = self.samples.len();
        for row in &mut self.rows {
            row.add_samples(page_samples.len(), &self.placeholder);
        }

        for block in blocks {
            let Some(id) = block_abbreviation(block) else {
                continue;
            };
            let Some(position) = self.fields.iter().position(|field| field == id) else {
                continue;
            };
            let grid = block
                .get("dataMatrix")
                .and_then(|value| value.as_array())
                .map(Vec::as_slice)
                .unwrap_or_default();
            for (variant, cells) in grid.iter().enumerate() {
                let cells = cells
                    .as_array()
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                if cells.is_empty() {
                    continue;
                }
                let row_count = self.rows.len();
                let row = self.rows.get_mut(variant).ok_or_else(|| {
                    BrapiError::MalformedPage(format!(
                        "{id} matrix has a row {variant} but the page declares {row_count} variants"
                    ))
                })?;
                for (sample, cell) in cells.iter().enumerate() {
                    if sample >= page_samples.len() {
                        return Err(BrapiError::MalformedPage(format!(
                            "{id} matrix has a column {sample} but the page declares {} call sets",
                            page_samples.len()
                        )));
                    }
                    row.samples[offset + sample][position] = cell_text(cell, &self.placeholder);
                }
            }
        }

        self.samples
            .extend(page_samples.into_iter().map(SampleId::new));
        Ok(())
    }

    pub fn finish(self, index: usize) -> MatrixPage {
        MatrixPage {
            index,
            samples: self.samples,
            rows: self.rows,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub variant_pages: usize,
    pub rows: usize,
}

/// Drives the two-dimensional allele-matrix pagination.
pub struct MatrixAssembler<'a, C: BrapiClient> {
    client: &'a C,
    config: &'a ResolvedConfig,
    index: Option<&'a VariantIndex>,
}

impl<'a, C: BrapiClient> MatrixAssembler<'a, C> {
    pub fn new(client: &'a C, config: &'a ResolvedConfig, index: Option<&'a VariantIndex>) -> Self {
        Self {
            client,
            config,
            index,
        }
    }

    /// Hands every completed variant page to `on_page`, in server order. A
    /// page is dropped once the callback returns.
    pub fn run<F>(&self, catalog: &mut FormatCatalog, mut on_page: F) -> Result<AssemblyStats, BrapiError>
    where
        F: FnMut(MatrixPage) -> Result<(), BrapiError>,
    {
        let mut stats = AssemblyStats::default();
        let mut variant_pages = PageCounter::new(Dimension::Variants.as_str());
        let mut variant_page = 0usize;
        while variant_pages.has_more(variant_page) {
            let mut call_set_pages = PageCounter::new(Dimension::CallSets.as_str());
            let mut builder = PageBuilder::new(&self.config.unknown_string);
            let mut call_set_page = 0usize;
            while call_set_pages.has_more(call_set_page) {
                let params = self.matrix_params(variant_page, call_set_page);
                let response = self.client.get(ALLELE_MATRIX_SERVICE, &params)?;
                variant_pages.observe(dimension_total_pages(&response, Dimension::Variants))?;
                call_set_pages.observe(dimension_total_pages(&response, Dimension::CallSets))?;
                if call_set_page == 0 {
                    let variant_ids = string_list(
                        response
                            .get("result")
                            .and_then(|value| value.get("variantDbIds")),
                    );
                    builder.start_rows(&variant_ids, self.index);
                }
                builder.apply(&response, catalog)?;
                debug!(
                    variant_page,
                    variant_pages = variant_pages.total(),
                    call_set_page,
                    call_set_pages = call_set_pages.total(),
                    "allele matrix page"
                );
                call_set_page += 1;
            }
            let page = builder.finish(variant_page);
            stats.rows += page.rows.len();
            stats.variant_pages += 1;
            on_page(page)?;
            variant_page += 1;
        }
        info!(
            variant_pages = stats.variant_pages,
            rows = stats.rows,
            format_fields = catalog.len(),
            "allele matrix assembled"
        );
        Ok(stats)
    }

    pub fn matrix_params(&self, variant_page: usize, call_set_page: usize) -> Vec<(&'static str, String)> {
        vec![
            ("dimensionVariantPage", variant_page.to_string()),
            ("dimensionVariantPageSize", self.config.variant_page_size.to_string()),
            ("dimensionCallSetPage", call_set_page.to_string()),
            ("dimensionCallSetPageSize", self.config.call_set_page_size.to_string()),
            ("sepPhased", self.config.sep_phased.clone()),
            ("sepUnphased", self.config.sep_unphased.clone()),
            ("unknownString", self.config.unknown_string.clone()),
        ]
    }
}

/// Collects call-set ids in server order with the preview form of the allele
/// matrix, which carries ids but no data.
pub fn discover_samples<C: BrapiClient>(
    client: &C,
    config: &ResolvedConfig,
) -> Result<Vec<SampleId>, BrapiError> {
    let mut samples = Vec::new();
    let mut pages = PageCounter::new(Dimension::CallSets.as_str());
    let mut page = 0usize;
    while pages.has_more(page) {
        let params = [
            ("dimensionVariantPageSize", "1".to_string()),
            ("dimensionCallSetPage", page.to_string()),
            ("dimensionCallSetPageSize", config.sample_page_size.to_string()),
            ("preview", "true".to_string()),
        ];
        let response = client.get(ALLELE_MATRIX_SERVICE, &params)?;
        pages.observe(dimension_total_pages(&response, Dimension::CallSets))?;
        let ids = string_list(
            response
                .get("result")
                .and_then(|value| value.get("callSetDbIds")),
        );
        debug!(page, total = pages.total(), samples = ids.len(), "sample page");
        samples.extend(ids.into_iter().map(SampleId::new));
        page += 1;
    }
    info!(samples = samples.len(), "samples discovered");
    Ok(samples)
}

fn block_abbreviation(block: &Value) -> Option<&str> {
    block
        .get("dataMatrixAbbreviation")
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
}

fn format_field(block: &Value, id: &str) -> FormatField {
    let data_type = block
        .get("dataType")
        .and_then(|value| value.as_str())
        .unwrap_or_default();
    let description = block
        .get("dataMatrixName")
        .and_then(|value| value.as_str())
        .unwrap_or_default();
    FormatField {
        id: id.to_string(),
        data_type: vcf_type(data_type).to_string(),
        description: description.to_string(),
    }
}

/// Maps a BrAPI `dataType` onto a VCF FORMAT type. `Flag` is only legal for
/// INFO, so boolean matrices are declared as `String`.
pub fn vcf_type(data_type: &str) -> &'static str {
    match data_type.trim().to_ascii_lowercase().as_str() {
        "integer" | "int" => "Integer",
        "float" | "double" | "number" => "Float",
        "character" | "char" => "Character",
        _ => "String",
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|value| value.as_array())
        .map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn cell_text(cell: &Value, placeholder: &str) -> String {
    match cell {
        Value::Null => placeholder.to_string(),
        Value::String(text) if text.is_empty() => placeholder.to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
