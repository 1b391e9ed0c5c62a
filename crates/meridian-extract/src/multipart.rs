//! `multipart/form-data` parsing with a bounded in-memory budget.
//!
//! Text fields go to the form values. File parts stay in memory while the
//! request's memory budget lasts and spill to a temporary file once it is
//! exhausted. Spill files are reported back so the request can remove them at
//! teardown.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

use bytes::{Bytes, BytesMut};
use http::{header, HeaderMap};

use crate::error::ExtractionError;
use crate::params::Values;
use crate::upload::{Storage, Upload};

/// In-memory budget for one multipart body (32 MiB).
pub const DEFAULT_MAX_MEMORY: usize = 32 << 20;

/// The parsed content of a multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    /// Text fields.
    pub values: Values,
    /// File parts by field name.
    pub files: HashMap<String, Vec<Upload>>,
    /// Temporary files backing spilled parts.
    pub spilled: Vec<PathBuf>,
}

impl MultipartForm {
    fn discard(&mut self) {
        for path in self.spilled.drain(..) {
            if let Err(err) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %err, "failed to remove multipart spill file");
            }
        }
    }
}

/// Parses a multipart body.
///
/// A field without a name, or a text field that is not valid UTF-8, is skipped
/// with a warning and parsing continues. A malformed stream is an error; any
/// spill files written before it are removed.
pub async fn parse_multipart(
    headers: &HeaderMap,
    body: Bytes,
    max_memory: usize,
) -> Result<MultipartForm, ExtractionError> {
    let mut form = MultipartForm::default();
    match read_fields(&mut form, headers, body, max_memory).await {
        Ok(()) => Ok(form),
        Err(err) => {
            form.discard();
            Err(err)
        }
    }
}

async fn read_fields(
    form: &mut MultipartForm,
    headers: &HeaderMap,
    body: Bytes,
    max_memory: usize,
) -> Result<(), ExtractionError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or(ExtractionError::MissingBoundary)?;
    let boundary =
        multer::parse_boundary(content_type).map_err(|_| ExtractionError::MissingBoundary)?;

    let stream = futures_util::stream::once(async move { Ok::<_, io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    let mut remaining = max_memory;

    while let Some(mut field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            tracing::warn!("skipping multipart field without a name");
            continue;
        };

        let Some(file_name) = field.file_name().map(str::to_owned) else {
            let data = field.bytes().await?;
            match String::from_utf8(data.to_vec()) {
                Ok(value) => {
                    remaining = remaining.saturating_sub(value.len());
                    form.values.entry(name).or_default().push(value);
                }
                Err(_) => {
                    tracing::warn!(field = %name, "skipping multipart field with invalid UTF-8 value");
                }
            }
            continue;
        };

        let content_type = field.content_type().map(ToString::to_string);
        let mut buffer = BytesMut::new();
        let mut spill: Option<(std::fs::File, PathBuf)> = None;
        let mut size = 0_u64;

        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            if spill.is_none() && buffer.len() + chunk.len() > remaining {
                let (mut file, path) = tempfile::Builder::new()
                    .prefix("meridian-upload-")
                    .tempfile()?
                    .keep()
                    .map_err(|err| err.error)?;
                form.spilled.push(path.clone());
                file.write_all(&buffer)?;
                buffer.clear();
                spill = Some((file, path));
            }
            match spill.as_mut() {
                Some((file, _)) => file.write_all(&chunk)?,
                None => buffer.extend_from_slice(&chunk),
            }
        }

        let storage = match spill {
            Some((file, path)) => {
                file.sync_all()?;
                Storage::Disk(path)
            }
            None => {
                remaining -= buffer.len();
                Storage::Memory(buffer.freeze())
            }
        };
        form.files
            .entry(name.clone())
            .or_default()
            .push(Upload::new(name, file_name, content_type, size, storage));
    }

    Ok(())
}
