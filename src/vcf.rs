use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use chrono::NaiveDate;

use crate::domain::{MISSING, SampleId};
use crate::error::BrapiError;
use crate::matrix::{FormatCatalog, FormatField, MatrixPage, MatrixRow};

pub const FILE_FORMAT: &str = "VCFv4.3";

/// INFO keys a data line can carry, declared whether or not they occur.
pub const INFO_DECLARATIONS: [&str; 5] = [
    "##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"Type of structural variant\">",
    "##INFO=<ID=END,Number=1,Type=Integer,Description=\"End position of the variant described in this record\">",
    "##INFO=<ID=SVLEN,Number=.,Type=Integer,Description=\"Difference in length between REF and ALT alleles\">",
    "##INFO=<ID=CIPOS,Number=2,Type=Integer,Description=\"Confidence interval around POS for imprecise variants\">",
    "##INFO=<ID=CIEND,Number=2,Type=Integer,Description=\"Confidence interval around END for imprecise variants\">",
];

const FIXED_COLUMNS: [&str; 9] = [
    "#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT",
];

/// Meta-information lines, rendered once the FORMAT catalog is final.
pub struct VcfHeader<'a> {
    pub source: &'a str,
    pub file_date: NaiveDate,
    pub catalog: &'a FormatCatalog,
}

impl VcfHeader<'_> {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("##fileformat={FILE_FORMAT}"),
            format!("##fileDate={}", self.file_date.format("%Y%m%d")),
            format!("##source={}", self.source),
        ];
        lines.extend(INFO_DECLARATIONS.iter().map(|line| line.to_string()));
        lines.extend(self.catalog.fields().iter().map(format_declaration));
        lines
    }

    /// Writes every meta line and returns the number of bytes written.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<u64> {
        let mut written = 0u64;
        for line in self.lines() {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
            written += line.len() as u64 + 1;
        }
        Ok(written)
    }
}

pub fn format_declaration(field: &FormatField) -> String {
    format!(
        "##FORMAT=<ID={},Number=1,Type={},Description=\"{}\">",
        field.id,
        field.data_type,
        field.description.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

pub fn column_header(samples: &[SampleId]) -> String {
    let mut columns = FIXED_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .collect::<Vec<_>>();
    columns.extend(samples.iter().map(|sample| sample.as_str().to_string()));
    columns.join("\t")
}

/// Sample ids of a `#CHROM` line, in column order.
pub fn parse_column_header(line: &str) -> Option<Vec<SampleId>> {
    let mut columns = line.trim_end_matches(['\r', '\n']).split('\t');
    for expected in FIXED_COLUMNS {
        if columns.next()? != expected {
            return None;
        }
    }
    Some(columns.map(SampleId::new).collect())
}

pub fn data_line(row: &MatrixRow) -> String {
    let mut columns = row.record.fixed_columns().to_vec();
    columns.push(or_missing(row.format_column()));
    columns.extend(
        row.samples
            .iter()
            .map(|values| or_missing(values.join(":"))),
    );
    columns.join("\t")
}

fn or_missing(value: String) -> String {
    if value.is_empty() {
        MISSING.to_string()
    } else {
        value
    }
}

/// Spool for the column header and data lines, which have to follow the
/// meta lines but are produced before those are known. Backed by an
/// anonymous temporary file that is removed when the buffer is dropped.
pub struct BodyBuffer {
    writer: BufWriter<File>,
    lines: usize,
}

impl BodyBuffer {
    pub fn new() -> Result<Self, BrapiError> {
        let file = tempfile::tempfile().map_err(|err| BrapiError::Output(err.to_string()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn write_column_header(&mut self, samples: &[SampleId]) -> Result<(), BrapiError> {
        self.write_line(&column_header(samples))
    }

    pub fn write_page(&mut self, page: &MatrixPage) -> Result<(), BrapiError> {
        for row in &page.rows {
            self.write_line(&data_line(row))?;
        }
        Ok(())
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Copies everything spooled so far into `out`.
    pub fn copy_into<W: Write>(self, out: &mut W) -> Result<u64, BrapiError> {
        let mut file = self
            .writer
            .into_inner()
            .map_err(|err| BrapiError::Output(err.to_string()))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|err| BrapiError::Output(err.to_string()))?;
        io::copy(&mut file, out).map_err(|err| BrapiError::Output(err.to_string()))
    }

    fn write_line(&mut self, line: &str) -> Result<(), BrapiError> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|err| BrapiError::Output(err.to_string()))?;
        self.lines += 1;
        Ok(())
    }
}
