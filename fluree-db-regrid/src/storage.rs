//! Mapping persistence.
//!
//! A mapping is stored as zstd-compressed, line-oriented, comma-separated
//! text so it can be computed once and reloaded for every later run.
//!
//! # Format
//!
//! ```text
//! zstd frame containing:
//!   line 1: indices of cell 0, comma separated   e.g. "0,2"
//!   line 2: indices of cell 1                    e.g. "1"
//!   line 3: (empty line = cell with no samples)  e.g. ""
//!   ...
//! ```
//!
//! Every line is terminated by `\n`, so a mapping of N cells has exactly N
//! lines and a zero-cell mapping is an empty document. Readers accept
//! `\r\n` line endings and whitespace around tokens.
//!
//! Readers also accept gzip-compressed mappings (`.csv.gz`) with the same
//! line layout; the codec is picked from the leading magic bytes.
//!
//! `save` writes to a temporary file beside the target and renames it into
//! place, so a failed save leaves any previous mapping file untouched.

use crate::config::StorageConfig;
use crate::error::{RegridError, Result};
use crate::mapping::IndexMapping;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Write `mapping` as compressed text to `writer`.
///
/// Returns the writer once the zstd frame has been finished.
pub fn write_mapping<W: Write>(
    mapping: &IndexMapping,
    writer: W,
    config: &StorageConfig,
) -> Result<W> {
    config.validate()?;

    let mut encoder = zstd::Encoder::new(writer, config.zstd_level)?;
    let mut line = String::new();
    for indices in mapping.iter() {
        line.clear();
        for (i, index) in indices.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&index.to_string());
        }
        line.push('\n');
        encoder.write_all(line.as_bytes())?;
    }
    Ok(encoder.finish()?)
}

/// gzip member header.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read a mapping written by [`write_mapping`], or a gzip-compressed
/// mapping with the same line layout.
pub fn read_mapping<R: Read>(reader: R) -> Result<IndexMapping> {
    let mut reader = BufReader::new(reader);
    if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        tracing::debug!("Reading gzip-compressed mapping");
        parse_lines(BufReader::new(flate2::read::MultiGzDecoder::new(reader)))
    } else {
        parse_lines(BufReader::new(zstd::Decoder::with_buffer(reader)?))
    }
}

/// Parse decompressed text, one index list per line.
///
/// Lines are read as raw bytes so that invalid UTF-8 is reported as a
/// parse error on its line rather than as a bare IO error.
fn parse_lines<B: BufRead>(mut reader: B) -> Result<IndexMapping> {
    let mut cells = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = std::str::from_utf8(&buf).map_err(|_| RegridError::MappingParse {
            line: line_no,
            token: String::from_utf8_lossy(&buf).trim().to_string(),
        })?;
        cells.push(parse_line(line, line_no)?);
    }
    Ok(IndexMapping::from(cells))
}

/// Parse one stored line into an index list. `line_no` is 1-based.
fn parse_line(line: &str, line_no: usize) -> Result<Vec<usize>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }
    line.split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<usize>()
                .map_err(|_| RegridError::MappingParse {
                    line: line_no,
                    token: token.to_string(),
                })
        })
        .collect()
}

/// Load a mapping from a file written by [`IndexMapping::save`].
pub fn load_mapping(path: impl AsRef<Path>) -> Result<IndexMapping> {
    let path = path.as_ref();
    let _span = tracing::debug_span!("mapping_load", path = %path.display()).entered();

    let file = File::open(path)?;
    let mapping = read_mapping(file)?;

    tracing::debug!(
        cells = mapping.size(),
        indices = mapping.total_indices(),
        "Loaded index mapping"
    );
    Ok(mapping)
}

impl IndexMapping {
    /// Save the mapping to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>, config: &StorageConfig) -> Result<()> {
        let path = path.as_ref();
        let _span = tracing::debug_span!(
            "mapping_save",
            path = %path.display(),
            cells = self.size()
        )
        .entered();

        config.validate()?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        let writer = write_mapping(self, BufWriter::new(tmp), config)?;
        let tmp = writer.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Serialize the mapping to compressed bytes.
    pub fn to_bytes(&self, config: &StorageConfig) -> Result<Vec<u8>> {
        write_mapping(self, Vec::new(), config)
    }

    /// Deserialize a mapping from compressed bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        read_mapping(data)
    }
}
