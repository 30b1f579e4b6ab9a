//! Upload → preview → fill → result state machine.
//!
//! The controller enforces its own guards: while a fill is in flight every
//! mutating action except [`Session::complete`] is rejected.

use crate::aspect_ratio::{AspectRatio, MAX_CANVAS_DIMENSION};
use crate::compositor::{compose, compute_canvas_size, CanvasDimensions, CompositedCanvas};
use crate::fill_service::{FillRequest, FillResult};
use crate::source_image::{DecodeError, SourceImage};
use crate::transport::{self, EncodeError};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A fill request is already in progress")]
    Busy,

    #[error("No image has been uploaded")]
    NoSource,

    #[error("Could not read image: {0}")]
    Decode(#[from] DecodeError),

    #[error("Could not prepare the image for upload: {0}")]
    Encode(#[from] EncodeError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Empty,
    Loaded,
    Filling {
        ticket: Uuid,
        started_at: DateTime<Utc>,
    },
    Filled {
        encoded_image: String,
        completed_at: DateTime<Utc>,
    },
    Errored {
        message: String,
        completed_at: DateTime<Utc>,
    },
}

/// Snapshot handed to the fill task. Its `id` must come back with the result.
#[derive(Debug, Clone)]
pub struct FillTicket {
    pub id: Uuid,
    pub request: FillRequest,
}

pub struct Session {
    state: SessionState,
    source: Option<SourceImage>,
    ratio: AspectRatio,
    prompt: String,
    max_dimension: u32,
    canvas_size: CanvasDimensions,
    canvas: Option<CompositedCanvas>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(MAX_CANVAS_DIMENSION)
    }
}

impl Session {
    pub fn new(max_dimension: u32) -> Self {
        let ratio = AspectRatio::default();
        Self {
            state: SessionState::Empty,
            source: None,
            ratio,
            prompt: String::new(),
            max_dimension,
            canvas_size: compute_canvas_size(&ratio, max_dimension),
            canvas: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn ratio(&self) -> AspectRatio {
        self.ratio
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn canvas_size(&self) -> CanvasDimensions {
        self.canvas_size
    }

    pub fn canvas(&self) -> Option<&CompositedCanvas> {
        self.canvas.as_ref()
    }

    pub fn result_image(&self) -> Option<&str> {
        match &self.state {
            SessionState::Filled { encoded_image, .. } => Some(encoded_image),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SessionState::Errored { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn is_filling(&self) -> bool {
        matches!(self.state, SessionState::Filling { .. })
    }

    pub fn can_upload(&self) -> bool {
        !self.is_filling()
    }

    pub fn can_change_ratio(&self) -> bool {
        !self.is_filling()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_filling() && self.canvas.is_some()
    }

    pub fn can_reset(&self) -> bool {
        !self.is_filling() && self.state != SessionState::Empty
    }

    pub fn can_download(&self) -> bool {
        self.result_image().is_some()
    }

    /// Decodes `bytes` and makes it the session's source image. On a decode
    /// failure the session is left untouched.
    pub fn upload(&mut self, bytes: &[u8], file_name: Option<&str>) -> Result<(), SessionError> {
        if self.is_filling() {
            return Err(SessionError::Busy);
        }
        let source = SourceImage::decode(bytes, file_name)?;
        self.load_source(source)
    }

    pub fn load_source(&mut self, source: SourceImage) -> Result<(), SessionError> {
        if self.is_filling() {
            return Err(SessionError::Busy);
        }
        log::info!(
            "📥 Loaded {} ({}x{})",
            source.file_name().unwrap_or("image"),
            source.width(),
            source.height()
        );
        self.source = Some(source);
        self.recompose();
        self.state = SessionState::Loaded;
        Ok(())
    }

    pub fn change_ratio(&mut self, ratio: AspectRatio) -> Result<(), SessionError> {
        if self.is_filling() {
            return Err(SessionError::Busy);
        }
        self.ratio = ratio;
        self.recompose();
        if self.source.is_some() {
            self.state = SessionState::Loaded;
        }
        log::debug!(
            "📐 Ratio {} -> canvas {}x{}",
            ratio.name(),
            self.canvas_size.width,
            self.canvas_size.height
        );
        Ok(())
    }

    /// Prompt edits never touch the request already in flight.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Encodes the current canvas and enters `Filling`.
    pub fn submit(&mut self) -> Result<FillTicket, SessionError> {
        if self.is_filling() {
            return Err(SessionError::Busy);
        }
        let (source, canvas) = match (&self.source, &self.canvas) {
            (Some(source), Some(canvas)) => (source, canvas),
            _ => return Err(SessionError::NoSource),
        };

        let mime_type = transport::transport_mime_for(source.mime_type()).to_string();
        let encoded_image = match transport::encode(canvas, &mime_type) {
            Ok(uri) => uri,
            Err(e) => {
                let error = SessionError::Encode(e);
                log::error!("❌ {}", error);
                self.state = SessionState::Errored {
                    message: error.to_string(),
                    completed_at: Utc::now(),
                };
                return Err(error);
            }
        };

        let ticket = FillTicket {
            id: Uuid::new_v4(),
            request: FillRequest {
                encoded_image,
                mime_type,
                user_prompt: self.prompt.clone(),
            },
        };
        self.state = SessionState::Filling {
            ticket: ticket.id,
            started_at: Utc::now(),
        };
        log::info!("⬆ Fill {} submitted", ticket.id);
        Ok(ticket)
    }

    /// Stores the outcome of `ticket_id`. Returns `false` and discards the
    /// result when that ticket is not the one in flight.
    pub fn complete(&mut self, ticket_id: Uuid, result: FillResult) -> bool {
        match self.state {
            SessionState::Filling { ticket, .. } if ticket == ticket_id => {}
            _ => {
                log::warn!("🗑 Discarding result for stale fill {}", ticket_id);
                return false;
            }
        }

        let completed_at = Utc::now();
        self.state = match result {
            FillResult::Success { encoded_image } => {
                log::info!("🎉 Fill {} completed", ticket_id);
                SessionState::Filled {
                    encoded_image,
                    completed_at,
                }
            }
            FillResult::Failure(failure) => {
                log::warn!("❌ Fill {} failed: {}", ticket_id, failure.message());
                SessionState::Errored {
                    message: failure.message(),
                    completed_at,
                }
            }
        };
        true
    }

    /// Back to `Empty`, default ratio, empty prompt.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.is_filling() {
            return Err(SessionError::Busy);
        }
        *self = Self::new(self.max_dimension);
        log::info!("🔄 Session reset");
        Ok(())
    }

    /// `<stem>-extended-<ratio>.<ext>` for the current result.
    pub fn download_file_name(&self) -> Option<String> {
        let encoded = self.result_image()?;
        let mime = encoded
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or("image/png");
        let stem = self
            .source
            .as_ref()
            .and_then(|s| s.file_stem())
            .unwrap_or("generated-image");
        Some(format!(
            "{}-extended-{}.{}",
            stem,
            self.ratio.file_label(),
            transport::extension_for(mime)
        ))
    }

    fn recompose(&mut self) {
        self.canvas_size = compute_canvas_size(&self.ratio, self.max_dimension);
        self.canvas = self
            .source
            .as_ref()
            .and_then(|source| compose(source, self.canvas_size));
    }
}
