use std::io::Write;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::brapi::BrapiClient;
use crate::capabilities::ServerCapabilities;
use crate::config::ResolvedConfig;
use crate::domain::{SERVER_INFO_CALL, SampleId};
use crate::error::BrapiError;
use crate::matrix::{FormatCatalog, MatrixAssembler, discover_samples};
use crate::output::{OutputSink, OutputTarget, RunSummary};
use crate::variants::VariantIndex;
use crate::vcf::{BodyBuffer, VcfHeader};

/// Final FORMAT catalog plus the spooled body of a completed matrix pass.
pub struct Conversion {
    source: String,
    file_date: NaiveDate,
    catalog: FormatCatalog,
    body: BodyBuffer,
    summary: RunSummary,
}

impl Conversion {
    /// Writes meta lines, then the spooled column header and data lines.
    pub fn write_to<W: Write>(self, out: &mut W) -> Result<RunSummary, BrapiError> {
        let header = VcfHeader {
            source: &self.source,
            file_date: self.file_date,
            catalog: &self.catalog,
        };
        let mut written = header
            .write_to(out)
            .map_err(|err| BrapiError::Output(err.to_string()))?;
        written += self.body.copy_into(out)?;
        out.flush()
            .map_err(|err| BrapiError::Output(err.to_string()))?;

        let mut summary = self.summary;
        summary.bytes_written = written;
        Ok(summary)
    }
}

pub struct Converter<C: BrapiClient> {
    client: C,
    config: ResolvedConfig,
    file_date: Option<NaiveDate>,
}

impl<C: BrapiClient> Converter<C> {
    pub fn new(client: C, config: ResolvedConfig) -> Self {
        Self {
            client,
            config,
            file_date: None,
        }
    }

    /// Pins `##fileDate` instead of using today's date.
    pub fn with_file_date(mut self, date: NaiveDate) -> Self {
        self.file_date = Some(date);
        self
    }

    pub fn capabilities(&self) -> Result<ServerCapabilities, BrapiError> {
        let server_info = self.client.get(SERVER_INFO_CALL, &[])?;
        let capabilities = ServerCapabilities::from_server_info(&server_info);
        info!(
            server = capabilities.server_name(),
            allele_matrix = capabilities.has_allele_matrix(),
            variants = capabilities.has_variants(),
            "server capabilities"
        );
        Ok(capabilities)
    }

    /// Runs every remote pass. Nothing reaches an output sink here, so a
    /// failure leaves no partial VCF behind.
    pub fn assemble(&self) -> Result<Conversion, BrapiError> {
        let capabilities = self.capabilities()?;
        capabilities.require_allele_matrix()?;

        let samples = discover_samples(&self.client, &self.config)?;
        let index = if capabilities.has_variants() {
            Some(VariantIndex::fetch(&self.client, &self.config)?)
        } else {
            info!("server has no variants service, writing variant ids only");
            None
        };

        let mut body = BodyBuffer::new()?;
        body.write_column_header(&samples)?;

        let mut catalog = FormatCatalog::new();
        let assembler = MatrixAssembler::new(&self.client, &self.config, index.as_ref());
        let stats = assembler.run(&mut catalog, |page| {
            warn_on_sample_mismatch(page.index, &page.samples, &samples);
            body.write_page(&page)
        })?;

        let file_date = self
            .file_date
            .unwrap_or_else(|| Local::now().date_naive());
        let summary = RunSummary {
            server_name: capabilities.server_name().to_string(),
            samples: samples.len(),
            variants: stats.rows,
            variant_pages: stats.variant_pages,
            indexed_variants: index.as_ref().map(VariantIndex::len).unwrap_or(0),
            format_fields: catalog
                .fields()
                .iter()
                .map(|field| field.id.clone())
                .collect(),
            bytes_written: 0,
            output: None,
        };

        Ok(Conversion {
            source: capabilities.server_name().to_string(),
            file_date,
            catalog,
            body,
            summary,
        })
    }

    pub fn write_vcf<W: Write>(&self, out: &mut W) -> Result<RunSummary, BrapiError> {
        self.assemble()?.write_to(out)
    }

    /// Full run into a file or stdout. The sink is opened only after the
    /// matrix pass succeeded and is finished exactly once.
    pub fn convert(&self, target: &OutputTarget) -> Result<RunSummary, BrapiError> {
        let conversion = self.assemble()?;
        let mut sink = OutputSink::open(target)?;
        let mut summary = conversion.write_to(&mut sink)?;
        sink.finish()?;
        summary.output = Some(target.to_string());
        info!(
            output = %target,
            variants = summary.variants,
            samples = summary.samples,
            "VCF written"
        );
        Ok(summary)
    }
}

fn warn_on_sample_mismatch(page: usize, page_samples: &[SampleId], header: &[SampleId]) {
    if page_samples != header {
        warn!(
            page,
            page_samples = page_samples.len(),
            header_samples = header.len(),
            "call sets of variant page differ from the column header"
        );
    }
}
