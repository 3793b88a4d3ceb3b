//! Chart archive encoding and decoding.
//!
//! A chart archive is a gzip-compressed tar stream with a single top-level
//! directory named after the chart:
//!
//! ```text
//! testchart/Chart.yaml
//! testchart/templates/deployment.yaml
//! testchart/values.yaml
//! ```
//!
//! Entry headers carry fixed ownership, mode and timestamps, so encoding the
//! same [`Chart`] always produces the same bytes.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use crate::chart::{check_file_path, Chart, ChartMetadata};
use crate::{Error, Result};

/// Name of the metadata file inside the chart directory.
pub const CHART_METADATA_FILE: &str = "Chart.yaml";

const ENTRY_MODE: u32 = 0o644;

/// Writes `chart` to `writer` as a gzip-compressed tar archive.
///
/// # Errors
///
/// Returns an error if the chart metadata or a file path is invalid, or the
/// writer fails.
pub fn write_archive<W: Write>(chart: &Chart, writer: W) -> Result<()> {
    chart.metadata.validate()?;

    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let root = chart.name();

    let metadata = serde_yaml::to_string(&chart.metadata)?;
    append_entry(
        &mut builder,
        &format!("{root}/{CHART_METADATA_FILE}"),
        metadata.as_bytes(),
    )?;

    for (path, contents) in &chart.files {
        check_file_path(path)?;
        append_entry(&mut builder, &format!("{root}/{path}"), contents)?;
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

/// Encodes `chart` into an in-memory archive.
///
/// # Errors
///
/// Returns an error if the chart metadata is invalid.
pub fn to_bytes(chart: &Chart) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_archive(chart, &mut buf)?;
    Ok(buf)
}

/// Reads a chart from a gzip-compressed tar archive.
///
/// # Errors
///
/// Returns [`Error::InvalidArchive`] if the archive has no `Chart.yaml`,
/// contains entries outside the chart directory, or mixes several top-level
/// directories.
pub fn load_archive<R: Read>(reader: R) -> Result<Chart> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut root: Option<String> = None;
    let mut metadata: Option<ChartMetadata> = None;
    let mut files = BTreeMap::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let entry_path = entry.path()?.into_owned();
        let (top, rest) = split_entry_path(&entry_path)?;

        match &root {
            Some(existing) if *existing != top => {
                return Err(Error::InvalidArchive {
                    reason: format!("multiple top-level directories: '{existing}' and '{top}'"),
                });
            }
            Some(_) => {}
            None => root = Some(top),
        }

        let Some(rest) = rest else {
            continue;
        };

        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;

        if rest == CHART_METADATA_FILE {
            metadata = Some(serde_yaml::from_slice(&contents)?);
        } else {
            files.insert(rest, contents);
        }
    }

    let metadata = metadata.ok_or_else(|| Error::InvalidArchive {
        reason: format!("{CHART_METADATA_FILE} not found in archive"),
    })?;
    metadata.validate()?;

    Ok(Chart { metadata, files })
}

/// Decodes a chart from archive bytes.
///
/// # Errors
///
/// See [`load_archive`].
pub fn from_bytes(bytes: &[u8]) -> Result<Chart> {
    load_archive(bytes)
}

/// Computes the `sha256:<hex>` content digest of `data`.
#[must_use]
pub fn sha256_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

fn append_entry<W: Write>(builder: &mut tar::Builder<W>, path: &str, data: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(ENTRY_MODE);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    builder.append_data(&mut header, path, data)?;
    Ok(())
}

/// Splits an entry path into its top-level directory and the remaining
/// `/`-joined path, if any.
fn split_entry_path(path: &Path) -> Result<(String, Option<String>)> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| Error::InvalidArchive {
                    reason: format!("entry path '{}' is not valid UTF-8", path.display()),
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(Error::InvalidArchive {
                    reason: format!("entry path '{}' escapes the chart directory", path.display()),
                });
            }
        }
    }

    let Some((top, rest)) = parts.split_first() else {
        return Err(Error::InvalidArchive {
            reason: "archive entry with empty path".to_string(),
        });
    };

    let rest = if rest.is_empty() {
        None
    } else {
        Some(rest.join("/"))
    };
    Ok(((*top).to_string(), rest))
}
