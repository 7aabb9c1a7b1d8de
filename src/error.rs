use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BrapiError {
    #[error("server does not advertise the {0} service")]
    #[diagnostic(help("the allele matrix is required to build a VCF file"))]
    MissingCapability(String),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("BrAPI request failed: {0}")]
    Http(String),

    #[error("BrAPI returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("BrAPI response is not valid JSON: {0}")]
    Decode(String),

    #[error("malformed page: {0}")]
    MalformedPage(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("output error: {0}")]
    Output(String),
}

impl BrapiError {
    /// Remote call failed or returned something that could not be decoded.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BrapiError::Http(_) | BrapiError::Status { .. } | BrapiError::Decode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_family() {
        assert!(BrapiError::Http("reset".to_string()).is_transport());
        assert!(
            BrapiError::Status {
                status: 502,
                message: "bad gateway".to_string()
            }
            .is_transport()
        );
        assert!(BrapiError::Decode("eof".to_string()).is_transport());
        assert!(!BrapiError::MalformedPage("x".to_string()).is_transport());
        assert!(!BrapiError::MissingCapability("allelematrix".to_string()).is_transport());
    }
}
