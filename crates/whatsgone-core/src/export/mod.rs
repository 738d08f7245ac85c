//! Export normalisation: reduces a scanner CSV export to a bare path list.
//!
//! The scanner writes one header line followed by one comma-separated row per
//! file whose first field is the quoted absolute path. Normalisation keeps
//! only that first field, unquoted, one path per line, in source order.
//!
//! The rewrite goes through a temporary file in the same directory that is
//! atomically persisted over the export. An interrupted or failed rewrite
//! therefore leaves the previous content intact, and an export that turned
//! out empty never replaces a good snapshot.
use csv::{ByteRecord, ReaderBuilder};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("export {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("export {} has no data rows, keeping previous content", .0.display())]
    Empty(PathBuf),

    #[error("export {} is malformed at line {line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Rewrite the export at `path` in place as one path per line.
///
/// Returns the number of paths written. On any error the file at `path` is
/// left exactly as it was, and no stray temporary file remains.
///
/// Every data row must have the same number of fields as the first data
/// row. An unquoted comma inside a path shows up as an extra field, and is
/// rejected instead of guessing where the path ends.
pub fn normalize_export(path: &Path) -> Result<usize, NormalizeError> {
    let io_err = |source: io::Error| NormalizeError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(NormalizeError::Missing(path.to_path_buf()));
        }
        Err(e) => return Err(io_err(e)),
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    // Dropping the temp file on an early return deletes it.
    let mut out = BufWriter::new(NamedTempFile::new_in(dir).map_err(io_err)?);

    let mut record = ByteRecord::new();
    let mut width: Option<usize> = None;
    let mut count = 0usize;

    loop {
        match reader.read_byte_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                return Err(NormalizeError::Malformed {
                    path: path.to_path_buf(),
                    line: e.position().map(|p| p.line()).unwrap_or(0),
                    reason: e.to_string(),
                });
            }
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let malformed = |reason: String| NormalizeError::Malformed {
            path: path.to_path_buf(),
            line,
            reason,
        };

        match width {
            None => width = Some(record.len()),
            Some(w) if w != record.len() => {
                return Err(malformed(format!(
                    "expected {w} fields, found {}",
                    record.len()
                )));
            }
            Some(_) => {}
        }

        let first = match record.get(0) {
            Some(field) if !field.is_empty() => field,
            _ => return Err(malformed("empty path field".to_owned())),
        };

        out.write_all(first).map_err(io_err)?;
        out.write_all(b"\n").map_err(io_err)?;
        count += 1;
    }

    // Release the read handle before replacing the file.
    drop(reader);

    if count == 0 {
        return Err(NormalizeError::Empty(path.to_path_buf()));
    }

    let tmp = out.into_inner().map_err(|e| io_err(e.into_error()))?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!("Replaced {} via temp file", path.display());
    info!("Normalised {count} paths into {}", path.display());
    Ok(count)
}
