//! [`LocalFileSink`]: attachment bytes on the local filesystem.
//!
//! Files land in `<upload_dir>/<owner>/<hash>_<name>`, where `hash` is the
//! first 16 hex digits of the SHA-256 of the bytes. Uploading the same bytes
//! under the same name twice yields the same URL.

use std::path::PathBuf;

use merit_core::store::{FileSink, Upload};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct LocalFileSink {
  root:     PathBuf,
  base_url: String,
}

impl LocalFileSink {
  /// `base_url` is the public prefix under which `root` is served.
  pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
    Self {
      root:     root.into(),
      base_url: base_url.into().trim_end_matches('/').to_owned(),
    }
  }
}

/// Reduce `name` to a single safe path component.
fn path_component(name: &str) -> Result<String> {
  let cleaned: String = name
    .chars()
    .map(|c| match c {
      'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
      _ => '_',
    })
    .collect();
  let cleaned = cleaned.trim_start_matches('.').to_owned();
  if cleaned.is_empty() {
    return Err(Error::InvalidName(name.to_owned()));
  }
  Ok(cleaned)
}

fn content_hash(bytes: &[u8]) -> String {
  let digest = Sha256::digest(bytes);
  hex::encode(&digest[..8])
}

impl FileSink for LocalFileSink {
  type Error = Error;

  async fn store(&self, owner: String, upload: Upload) -> Result<String> {
    let owner = path_component(&owner)?;
    let name = format!(
      "{}_{}",
      content_hash(&upload.bytes),
      path_component(&upload.file_name)?
    );

    let dir = self.root.join(&owner);
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(&name), &upload.bytes).await?;

    tracing::debug!(%owner, %name, size = upload.bytes.len(), "stored upload");
    Ok(format!("{}/{owner}/{name}", self.base_url))
  }
}
