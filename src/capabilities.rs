use std::collections::BTreeSet;

use serde_json::Value;

use crate::domain::{ALLELE_MATRIX_SERVICE, VARIANTS_SERVICE};
use crate::error::BrapiError;

const DEFAULT_SERVER_NAME: &str = "BrAPI";

/// Services advertised by `serverinfo`, read once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCapabilities {
    server_name: String,
    services: BTreeSet<String>,
}

impl ServerCapabilities {
    pub fn from_server_info(server_info: &Value) -> Self {
        let result = server_info.get("result");
        let services = result
            .and_then(|value| value.get("calls"))
            .and_then(|value| value.as_array())
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|call| call.get("service"))
                    .filter_map(|value| value.as_str())
                    .map(|value| value.trim().to_string())
                    .collect::<BTreeSet<_>>()
            })
            .unwrap_or_default();
        let server_name = result
            .and_then(|value| value.get("serverName"))
            .and_then(|value| value.as_str())
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());

        Self {
            server_name,
            services,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn has_service(&self, service: &str) -> bool {
        self.services.contains(service)
    }

    pub fn has_allele_matrix(&self) -> bool {
        self.has_service(ALLELE_MATRIX_SERVICE)
    }

    pub fn has_variants(&self) -> bool {
        self.has_service(VARIANTS_SERVICE)
    }

    pub fn require_allele_matrix(&self) -> Result<(), BrapiError> {
        if self.has_allele_matrix() {
            Ok(())
        } else {
            Err(BrapiError::MissingCapability(
                ALLELE_MATRIX_SERVICE.to_string(),
            ))
        }
    }
}
