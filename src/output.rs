use std::fmt;
use std::io::{self, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::BrapiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Path(Utf8PathBuf),
    Stdout,
}

impl OutputTarget {
    pub fn from_arg(path: Option<&str>) -> Self {
        match path {
            Some(path) if path != "-" => OutputTarget::Path(Utf8PathBuf::from(path)),
            _ => OutputTarget::Stdout,
        }
    }

    pub fn is_gzip(&self) -> bool {
        match self {
            OutputTarget::Path(path) => path.extension() == Some("gz"),
            OutputTarget::Stdout => false,
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Path(path) => write!(f, "{path}"),
            OutputTarget::Stdout => write!(f, "<stdout>"),
        }
    }
}

enum Sink {
    Plain {
        writer: BufWriter<NamedTempFile>,
        dest: Utf8PathBuf,
    },
    Gzip {
        writer: GzEncoder<BufWriter<NamedTempFile>>,
        dest: Utf8PathBuf,
    },
    Stdout(io::Stdout),
}

/// Destination of the finished VCF text.
///
/// File output goes to a temporary file next to the destination and is only
/// renamed into place by [`OutputSink::finish`]; dropping an unfinished sink
/// removes the temporary file.
pub struct OutputSink {
    sink: Sink,
}

impl OutputSink {
    pub fn open(target: &OutputTarget) -> Result<Self, BrapiError> {
        let sink = match target {
            OutputTarget::Stdout => Sink::Stdout(io::stdout()),
            OutputTarget::Path(dest) => {
                let temp = temp_file_for(dest)?;
                let writer = BufWriter::new(temp);
                if target.is_gzip() {
                    Sink::Gzip {
                        writer: GzEncoder::new(writer, Compression::default()),
                        dest: dest.clone(),
                    }
                } else {
                    Sink::Plain {
                        writer,
                        dest: dest.clone(),
                    }
                }
            }
        };
        Ok(Self { sink })
    }

    pub fn finish(self) -> Result<(), BrapiError> {
        match self.sink {
            Sink::Stdout(mut stdout) => stdout
                .flush()
                .map_err(|err| BrapiError::Output(err.to_string())),
            Sink::Plain { writer, dest } => persist(writer, &dest),
            Sink::Gzip { writer, dest } => {
                let writer = writer
                    .finish()
                    .map_err(|err| BrapiError::Output(err.to_string()))?;
                persist(writer, &dest)
            }
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Sink::Plain { writer, .. } => writer.write(buf),
            Sink::Gzip { writer, .. } => writer.write(buf),
            Sink::Stdout(stdout) => stdout.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Plain { writer, .. } => writer.flush(),
            Sink::Gzip { writer, .. } => writer.flush(),
            Sink::Stdout(stdout) => stdout.flush(),
        }
    }
}

fn temp_file_for(dest: &Utf8Path) -> Result<NamedTempFile, BrapiError> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(".brapi2vcf")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| BrapiError::Output(format!("create temp file in {parent}: {err}")))
}

fn persist(writer: BufWriter<NamedTempFile>, dest: &Utf8Path) -> Result<(), BrapiError> {
    let temp = writer
        .into_inner()
        .map_err(|err| BrapiError::Output(err.to_string()))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| BrapiError::Output(format!("write {dest}: {err}")))?;
    Ok(())
}

/// What a finished run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub server_name: String,
    pub samples: usize,
    pub variants: usize,
    pub variant_pages: usize,
    pub indexed_variants: usize,
    pub format_fields: Vec<String>,
    pub bytes_written: u64,
    pub output: Option<String>,
}

pub struct JsonOutput;

impl JsonOutput {
    /// Summary goes to stderr since stdout may carry the VCF itself.
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        let json = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
        let mut stderr = io::stderr();
        stderr.write_all(json.as_bytes())?;
        stderr.write_all(b"\n")?;
        Ok(())
    }
}
