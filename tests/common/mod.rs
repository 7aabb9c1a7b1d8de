#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::NaiveDate;
use serde_json::{Value, json};

use brapi_vcf::brapi::{BrapiClient, Params};
use brapi_vcf::error::BrapiError;

pub fn file_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// One data matrix of the fake server; `None` cells are never reported, and
/// a block is left out of a page when all of its cells there are `None`.
#[derive(Clone)]
pub struct FakeBlock {
    pub abbreviation: String,
    pub data_type: String,
    pub name: String,
    pub grid: Vec<Vec<Option<String>>>,
}

impl FakeBlock {
    pub fn new(abbreviation: &str, data_type: &str, name: &str, grid: &[&[Option<&str>]]) -> Self {
        Self {
            abbreviation: abbreviation.to_string(),
            data_type: data_type.to_string(),
            name: name.to_string(),
            grid: grid
                .iter()
                .map(|row| row.iter().map(|cell| cell.map(str::to_string)).collect())
                .collect(),
        }
    }

    pub fn dense(abbreviation: &str, data_type: &str, name: &str, grid: &[&[&str]]) -> Self {
        let rows = grid
            .iter()
            .map(|row| row.iter().map(|cell| Some(*cell)).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let rows = rows.iter().map(Vec::as_slice).collect::<Vec<_>>();
        Self::new(abbreviation, data_type, name, &rows)
    }
}

/// In-memory BrAPI server that pages its data like a real one.
pub struct FakeServer {
    pub server_name: Option<String>,
    pub services: Vec<String>,
    pub variant_ids: Vec<String>,
    pub samples: Vec<String>,
    pub blocks: Vec<FakeBlock>,
    pub variants: Vec<Value>,
    /// Call that fails once it has been answered this many times.
    pub failing_call: Option<(String, usize)>,
    pub requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeServer {
    pub fn new(services: &[&str], variant_ids: &[&str], samples: &[&str]) -> Self {
        Self {
            server_name: Some("Fake BrAPI".to_string()),
            services: services.iter().map(|s| s.to_string()).collect(),
            variant_ids: variant_ids.iter().map(|s| s.to_string()).collect(),
            samples: samples.iter().map(|s| s.to_string()).collect(),
            blocks: Vec::new(),
            variants: Vec::new(),
            failing_call: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_block(mut self, block: FakeBlock) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn with_variant(mut self, entry: Value) -> Self {
        self.variants.push(entry);
        self
    }

    pub fn failing(self, call: &str) -> Self {
        self.failing_after(call, 0)
    }

    /// Answers `call` normally `answered` times, then resets the connection.
    pub fn failing_after(mut self, call: &str, answered: usize) -> Self {
        self.failing_call = Some((call.to_string(), answered));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    fn server_info(&self) -> Value {
        let calls = self
            .services
            .iter()
            .map(|service| json!({"service": service, "methods": ["GET"], "versions": ["2.1"]}))
            .collect::<Vec<_>>();
        let mut result = json!({"calls": calls});
        if let Some(name) = &self.server_name {
            result["serverName"] = json!(name);
        }
        json!({"metadata": {}, "result": result})
    }

    fn variants_page(&self, params: &Params<'_>) -> Value {
        let page = param(params, "page", 0);
        let size = param(params, "pageSize", 1000);
        let data = slice(&self.variants, page, size).to_vec();
        json!({
            "metadata": {"pagination": {
                "currentPage": page,
                "pageSize": size,
                "totalCount": self.variants.len(),
                "totalPages": total_pages(self.variants.len(), size)
            }},
            "result": {"data": data}
        })
    }

    fn allele_matrix(&self, params: &Params<'_>) -> Value {
        let variant_page = param(params, "dimensionVariantPage", 0);
        let variant_size = param(params, "dimensionVariantPageSize", 100);
        let call_set_page = param(params, "dimensionCallSetPage", 0);
        let call_set_size = param(params, "dimensionCallSetPageSize", 100);
        let preview = params
            .iter()
            .any(|(key, value)| *key == "preview" && value == "true");

        let variant_start = variant_page * variant_size;
        let call_set_start = call_set_page * call_set_size;
        let variant_ids = slice(&self.variant_ids, variant_page, variant_size);
        let samples = slice(&self.samples, call_set_page, call_set_size);

        let mut matrices = Vec::new();
        if !preview {
            for block in &self.blocks {
                let grid = (0..variant_ids.len())
                    .map(|v| {
                        (0..samples.len())
                            .map(|s| {
                                block
                                    .grid
                                    .get(variant_start + v)
                                    .and_then(|row| row.get(call_set_start + s))
                                    .cloned()
                                    .flatten()
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>();
                if grid.iter().flatten().all(Option::is_none) {
                    continue;
                }
                matrices.push(json!({
                    "dataMatrixAbbreviation": block.abbreviation,
                    "dataMatrixName": block.name,
                    "dataType": block.data_type,
                    "dataMatrix": grid
                }));
            }
        }

        json!({
            "metadata": {},
            "result": {
                "pagination": [
                    {
                        "dimension": "VARIANTS",
                        "page": variant_page,
                        "pageSize": variant_size,
                        "totalCount": self.variant_ids.len(),
                        "totalPages": total_pages(self.variant_ids.len(), variant_size)
                    },
                    {
                        "dimension": "CALLSETS",
                        "page": call_set_page,
                        "pageSize": call_set_size,
                        "totalCount": self.samples.len(),
                        "totalPages": total_pages(self.samples.len(), call_set_size)
                    }
                ],
                "variantDbIds": variant_ids,
                "callSetDbIds": samples,
                "dataMatrices": matrices
            }
        })
    }
}

impl BrapiClient for FakeServer {
    fn get(&self, call: &str, params: &Params<'_>) -> Result<Value, BrapiError> {
        let earlier = {
            let mut requests = self.requests.lock().unwrap();
            let earlier = requests.iter().filter(|(seen, _)| seen == call).count();
            requests.push((
                call.to_string(),
                params
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect(),
            ));
            earlier
        };
        if let Some((failing, answered)) = &self.failing_call
            && failing == call
            && earlier >= *answered
        {
            return Err(BrapiError::Http(format!("{call}: connection reset")));
        }
        match call {
            "serverinfo" => Ok(self.server_info()),
            "variants" => Ok(self.variants_page(params)),
            "allelematrix" => Ok(self.allele_matrix(params)),
            other => Err(BrapiError::Status {
                status: 404,
                message: format!("unknown call {other}"),
            }),
        }
    }
}

/// Replays canned responses in order, whatever the request.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Value>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

impl BrapiClient for ScriptedClient {
    fn get(&self, call: &str, _params: &Params<'_>) -> Result<Value, BrapiError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BrapiError::Http(format!("{call}: no scripted response left")))
    }
}

fn param(params: &Params<'_>, name: &str, default: usize) -> usize {
    params
        .iter()
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(default)
}

fn slice<T>(items: &[T], page: usize, size: usize) -> &[T] {
    let start = (page * size).min(items.len());
    let end = (start + size).min(items.len());
    &items[start..end]
}

fn total_pages(count: usize, size: usize) -> usize {
    count.div_ceil(size)
}

/// Data lines of a rendered VCF, split into columns.
pub fn data_lines(vcf: &str) -> Vec<Vec<String>> {
    vcf.lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}
