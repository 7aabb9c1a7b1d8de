use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::error;
use tracing_subscriber::EnvFilter;

use brapi_vcf::app::Converter;
use brapi_vcf::brapi::BrapiHttpClient;
use brapi_vcf::config::ConfigLoader;
use brapi_vcf::domain::FilterColumn;
use brapi_vcf::error::BrapiError;
use brapi_vcf::output::{JsonOutput, OutputTarget};

#[derive(Parser)]
#[command(name = "brapi2vcf")]
#[command(about = "Construct a VCF file from BrAPI endpoint data")]
#[command(version, author)]
struct Cli {
    /// Base URL of the BrAPI server, e.g. https://test-server.brapi.org/brapi/v2
    url: String,

    /// Write the VCF here instead of stdout (`.gz` is compressed)
    #[arg(short, long)]
    output: Option<String>,

    /// JSON config with page sizes and rendering options
    #[arg(long)]
    config: Option<String>,

    /// Column that receives the names of failed filters (overrides the config)
    #[arg(long, value_enum)]
    failed_filters: Option<FilterColumn>,

    /// Print a JSON run summary to stderr
    #[arg(long)]
    summary: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        let brapi = report.downcast_ref::<BrapiError>();
        if let Some(BrapiError::MissingCapability(_)) = brapi {
            error!("No allelematrix in BrAPI endpoint");
        } else {
            eprintln!("{report:?}");
        }
        return ExitCode::from(brapi.map(map_exit_code).unwrap_or(1));
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BrapiError) -> u8 {
    match error {
        BrapiError::MissingCapability(_) => 2,
        err if err.is_transport() => 3,
        BrapiError::MalformedPage(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("brapi_vcf=info,brapi2vcf=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(column) = cli.failed_filters {
        config.failed_filters_column = column;
    }
    let client = BrapiHttpClient::new(&cli.url, &config)?;
    let target = OutputTarget::from_arg(cli.output.as_deref());

    let converter = Converter::new(client, config);
    let summary = converter.convert(&target)?;
    if cli.summary {
        JsonOutput::print_summary(&summary).into_diagnostic()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit_code_of(err: BrapiError) -> Option<u8> {
        let report = miette::Report::new(err);
        report.downcast_ref::<BrapiError>().map(map_exit_code)
    }

    #[test]
    fn report_downcast_keeps_exit_codes() {
        assert_eq!(
            exit_code_of(BrapiError::MissingCapability("allelematrix".to_string())),
            Some(2)
        );
        assert_eq!(exit_code_of(BrapiError::Http("timed out".to_string())), Some(3));
        assert_eq!(
            exit_code_of(BrapiError::MalformedPage("totalPages".to_string())),
            Some(4)
        );
        assert_eq!(exit_code_of(BrapiError::Output("disk full".to_string())), Some(1));
    }
}
