//! Compressed copies of uploads.
//!
//! PDFs are rewritten by `lopdf` with compressed streams. Videos are
//! re-encoded by the `ffmpeg` binary (H.264, CRF 23).

use crate::document::FileKind;
use crate::error::{DocqueryError, Result};
use lopdf::Document;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Produces the compressed copy stored next to every original.
#[derive(Debug, Clone)]
pub struct Compressor {
    ffmpeg: String,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

impl Compressor {
    /// Use a specific ffmpeg executable.
    pub fn with_ffmpeg(ffmpeg: impl Into<String>) -> Self {
        Self { ffmpeg: ffmpeg.into() }
    }

    /// Compress `source` into `dest` according to its kind.
    #[instrument(skip(self), fields(kind = ?kind))]
    pub async fn compress(&self, kind: FileKind, source: &Path, dest: &Path) -> Result<()> {
        match kind {
            FileKind::Pdf => {
                let (source, dest) = (source.to_path_buf(), dest.to_path_buf());
                tokio::task::spawn_blocking(move || compress_pdf(&source, &dest))
                    .await
                    .map_err(|e| DocqueryError::Compression(format!("compression task failed: {}", e)))?
            }
            FileKind::Mp4 => self.compress_video(source, dest).await,
        }
    }

    async fn compress_video(&self, source: &Path, dest: &Path) -> Result<()> {
        let result = Command::new(&self.ffmpeg)
            .arg("-i").arg(source)
            .arg("-vcodec").arg("libx264")
            .arg("-crf").arg("23")
            .arg("-preset").arg("medium")
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => {
                debug!("Video re-encoded");
                Ok(())
            }
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                Err(DocqueryError::Compression(format!("ffmpeg failed: {}", err.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DocqueryError::ToolNotFound(self.ffmpeg.clone()))
            }
            Err(e) => Err(DocqueryError::Compression(format!("ffmpeg error: {e}"))),
        }
    }
}

/// Rewrite a PDF with every stream compressed.
pub fn compress_pdf(source: &Path, dest: &Path) -> Result<()> {
    let mut document = Document::load(source)
        .map_err(|e| DocqueryError::Compression(format!("cannot open PDF: {}", e)))?;
    document.prune_objects();
    document.compress();
    document
        .save(dest)
        .map_err(|e| DocqueryError::Compression(format!("cannot write PDF: {}", e)))?;
    Ok(())
}

/// Name of the compressed copy inside a scratch directory.
pub fn compressed_path(dir: &Path, kind: FileKind) -> PathBuf {
    dir.join(format!("compressed.{}", kind.extension()))
}
