//! Renders a channel's history, one SVG file per message.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::directory::Directory;
use crate::discord::MessagePayload;
use crate::document::Composer;
use crate::error::{ApiError, RenderError, TranscribeError};
use crate::images::{ImageCache, ImageSource};
use crate::message::Message;
use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedMessage {
    pub id: u64,
    pub error: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub written: usize,
    pub failed: Vec<FailedMessage>,
}

impl TranscribeError {
    /// Whether another attempt could succeed. Lookups against the directory
    /// give the same answer every time.
    pub fn is_transient(&self) -> bool {
        match self {
            TranscribeError::Render(RenderError::Image(_)) => true,
            TranscribeError::Render(_) => false,
            TranscribeError::Write { .. } => true,
            TranscribeError::Api(_) => false,
        }
    }
}

pub struct Transcriber<'a, S> {
    pub theme: &'a Theme,
    pub line_width: usize,
    pub output_dir: &'a Path,
    pub max_attempts: u32,
    pub images: &'a ImageCache<S>,
}

impl<S: ImageSource> Transcriber<'_, S> {
    /// Renders `message` and writes it to the output directory. Nothing is
    /// left behind when rendering or writing fails.
    pub fn transcribe(
        &self,
        message: &Message,
        directory: &Directory,
    ) -> Result<PathBuf, TranscribeError> {
        let svg = Composer::new(self.theme, self.line_width, directory, self.images)
            .compose(message)?;

        let path = self.output_dir.join(message.file_name());
        let partial = path.with_extension("svg.partial");
        let write_err = |source| TranscribeError::Write {
            path: path.display().to_string(),
            source,
        };
        std::fs::write(&partial, svg).map_err(write_err)?;
        if let Err(source) = std::fs::rename(&partial, &path) {
            let _ = std::fs::remove_file(&partial);
            return Err(write_err(source));
        }
        Ok(path)
    }

    /// Transcribes every message from `history`, printing each written file
    /// name to `out`.
    ///
    /// A failing message is retried while the failure is transient, up to
    /// `max_attempts` in total, then recorded in the summary; the run moves
    /// on to the next message. Only a failure to read history ends the run.
    pub fn run<I, W>(
        &self,
        history: I,
        directory: &mut Directory,
        out: &mut W,
    ) -> Result<Summary, ApiError>
    where
        I: IntoIterator<Item = Result<MessagePayload, ApiError>>,
        W: Write,
    {
        let mut summary = Summary::default();

        for payload in history {
            let payload = payload?;
            let id = payload.id.parse().unwrap_or_default();
            let _span = tracing::info_span!("message", id).entered();

            let message = match payload.into_message(directory) {
                Ok(message) => message,
                Err(err) => {
                    tracing::error!(error = %err, "skipping malformed message");
                    summary.failed.push(FailedMessage {
                        id,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            match self.transcribe_with_retry(&message, directory) {
                Ok(path) => {
                    tracing::debug!(path = %path.display(), "wrote message");
                    if let Err(err) = writeln!(out, "{}", message.file_name()) {
                        tracing::warn!(error = %err, "failed to report file name");
                    }
                    summary.written += 1;
                }
                Err(err) => {
                    tracing::error!(error = %err, "message failed");
                    summary.failed.push(FailedMessage {
                        id: message.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }

    fn transcribe_with_retry(
        &self,
        message: &Message,
        directory: &Directory,
    ) -> Result<PathBuf, TranscribeError> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.transcribe(message, directory) {
                Ok(path) => return Ok(path),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    tracing::warn!(attempt, error = %err, "retrying message");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
