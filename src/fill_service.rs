//! One round trip to the AI fill model, normalized into a [`FillResult`].

use crate::transport::strip_data_uri_header;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const BASE_INSTRUCTION: &str = "This image has blank areas (padding). Fill these blank areas with content that seamlessly extends the original image, maintaining the same style and context. Do not alter the original part of the image. Generate a new image with the exact same dimensions.";

const REFUSED_HEADLINE: &str = "AI did not return an image. It might have refused the request.";
const TRANSPORT_HEADLINE: &str = "Failed to generate image with AI.";

/// The full instruction sent alongside the image.
pub fn build_instruction(user_prompt: &str) -> String {
    if user_prompt.is_empty() {
        BASE_INSTRUCTION.to_string()
    } else {
        format!(
            "{} The user has provided additional instructions: \"{}\"",
            BASE_INSTRUCTION, user_prompt
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload without any data-URI header.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelPart {
    Text(String),
    Image(InlineImage),
}

/// The remote image model. Implementations are handed to
/// [`FillOrchestrator::new`]; nothing in the crate holds a global client.
pub trait ImageModel: Send + Sync {
    type Error: Display + Send;

    fn generate(
        &self,
        image: InlineImage,
        instruction: String,
    ) -> impl Future<Output = Result<Vec<ModelPart>, Self::Error>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillRequest {
    /// Full data URI of the composited canvas.
    pub encoded_image: String,
    pub mime_type: String,
    pub user_prompt: String,
}

impl FillRequest {
    pub fn instruction(&self) -> String {
        build_instruction(&self.user_prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service answered without an image.
    Refused,
    /// Network, protocol or timeout failure.
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillFailure {
    pub kind: FailureKind,
    /// Text returned by the service, or the underlying error message.
    pub details: String,
}

impl FillFailure {
    pub fn refused(details: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Refused,
            details: details.into(),
        }
    }

    pub fn transport(details: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            details: details.into(),
        }
    }

    pub fn headline(&self) -> &'static str {
        match self.kind {
            FailureKind::Refused => REFUSED_HEADLINE,
            FailureKind::Transport => TRANSPORT_HEADLINE,
        }
    }

    /// User-facing message.
    pub fn message(&self) -> String {
        match self.kind {
            FailureKind::Refused if self.details.is_empty() => REFUSED_HEADLINE.to_string(),
            FailureKind::Refused => format!("{} {}", REFUSED_HEADLINE, self.details),
            FailureKind::Transport => format!("Failed to generate image with AI: {}", self.details),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillResult {
    Success { encoded_image: String },
    Failure(FillFailure),
}

pub struct FillOrchestrator<M> {
    model: M,
    timeout: Option<Duration>,
}

impl<M: ImageModel> FillOrchestrator<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            timeout: None,
        }
    }

    /// `None` waits for as long as the service takes.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn fill(&self, request: &FillRequest) -> FillResult {
        self.request_fill(&request.encoded_image, &request.mime_type, &request.user_prompt)
            .await
    }

    /// Sends the canvas and instruction once. Never retries.
    pub async fn request_fill(
        &self,
        encoded_image: &str,
        mime_type: &str,
        user_prompt: &str,
    ) -> FillResult {
        let image = InlineImage {
            mime_type: mime_type.to_string(),
            data: strip_data_uri_header(encoded_image).to_string(),
        };
        let instruction = build_instruction(user_prompt);

        log::info!(
            "🚀 Requesting fill ({}, {} payload bytes, custom prompt: {})",
            mime_type,
            image.data.len(),
            !user_prompt.is_empty()
        );

        let call = self.model.generate(image, instruction);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    log::error!("⏱ Fill request timed out after {:?}", limit);
                    return FillResult::Failure(FillFailure::transport(format!(
                        "request timed out after {} seconds",
                        limit.as_secs_f32()
                    )));
                }
            },
            None => call.await,
        };

        let parts = match outcome {
            Ok(parts) => parts,
            Err(e) => {
                log::error!("❌ Error calling image model: {}", e);
                return FillResult::Failure(FillFailure::transport(e.to_string()));
            }
        };

        let mut text = String::new();
        for part in parts {
            match part {
                ModelPart::Image(image) => {
                    log::info!("✅ Model returned an image ({})", image.mime_type);
                    return FillResult::Success {
                        encoded_image: format!("data:{};base64,{}", image.mime_type, image.data),
                    };
                }
                ModelPart::Text(t) => text.push_str(&t),
            }
        }

        log::warn!("⚠ Model returned no image. Response text: {}", text);
        FillResult::Failure(FillFailure::refused(text))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    pub(crate) enum Script {
        Parts(Vec<ModelPart>),
        Error(String),
        Stall(Duration),
    }

    /// Model double that replays a fixed answer and records every call.
    #[derive(Clone)]
    pub(crate) struct ScriptedModel {
        script: Script,
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<(InlineImage, String)>>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(script: Script) -> Self {
            Self {
                script,
                calls: Arc::new(AtomicUsize::new(0)),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn image(mime_type: &str, data: &str) -> Self {
            Self::new(Script::Parts(vec![ModelPart::Image(InlineImage {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            })]))
        }

        pub(crate) fn text(text: &str) -> Self {
            Self::new(Script::Parts(vec![ModelPart::Text(text.to_string())]))
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn seen(&self) -> Vec<(InlineImage, String)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl ImageModel for ScriptedModel {
        type Error = String;

        async fn generate(
            &self,
            image: InlineImage,
            instruction: String,
        ) -> Result<Vec<ModelPart>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((image, instruction));
            match &self.script {
                Script::Parts(parts) => Ok(parts.clone()),
                Script::Error(message) => Err(message.clone()),
                Script::Stall(delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(Vec::new())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Script, ScriptedModel};
    use super::*;

    #[test]
    fn test_empty_prompt_is_base_instruction_verbatim() {
        assert_eq!(build_instruction(""), BASE_INSTRUCTION);
        assert!(!build_instruction("").contains('"'));
    }

    #[test]
    fn test_user_prompt_is_appended_as_quoted_clause() {
        let instruction = build_instruction("add a starry sky");
        assert!(instruction.starts_with(BASE_INSTRUCTION));
        assert!(instruction.ends_with(
            " The user has provided additional instructions: \"add a starry sky\""
        ));
    }

    #[tokio::test]
    async fn test_image_part_becomes_data_uri() {
        let model = ScriptedModel::new(Script::Parts(vec![
            ModelPart::Text("Sure!".to_string()),
            ModelPart::Image(InlineImage {
                mime_type: "image/png".to_string(),
                data: "Rk9P".to_string(),
            }),
            ModelPart::Image(InlineImage {
                mime_type: "image/jpeg".to_string(),
                data: "SECOND".to_string(),
            }),
        ]));
        let orchestrator = FillOrchestrator::new(model.clone());

        let result = orchestrator
            .request_fill("data:image/jpeg;base64,QUJD", "image/jpeg", "")
            .await;

        assert_eq!(
            result,
            FillResult::Success {
                encoded_image: "data:image/png;base64,Rk9P".to_string()
            }
        );
        let seen = model.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.data, "QUJD");
        assert_eq!(seen[0].0.mime_type, "image/jpeg");
        assert_eq!(seen[0].1, BASE_INSTRUCTION);
    }

    #[tokio::test]
    async fn test_text_only_response_is_refusal() {
        let orchestrator = FillOrchestrator::new(ScriptedModel::text("I can't edit this photo."));
        let result = orchestrator
            .request_fill("data:image/png;base64,QUJD", "image/png", "more trees")
            .await;

        match result {
            FillResult::Failure(failure) => {
                assert_eq!(failure.kind, FailureKind::Refused);
                assert_eq!(failure.details, "I can't edit this photo.");
                assert_eq!(
                    failure.message(),
                    "AI did not return an image. It might have refused the request. I can't edit this photo."
                );
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_response_is_refusal_without_details() {
        let orchestrator = FillOrchestrator::new(ScriptedModel::new(Script::Parts(Vec::new())));
        let result = orchestrator.request_fill("QUJD", "image/png", "").await;
        assert_eq!(
            result,
            FillResult::Failure(FillFailure::refused(""))
        );
        if let FillResult::Failure(f) = result {
            assert_eq!(f.message(), REFUSED_HEADLINE);
        }
    }

    #[tokio::test]
    async fn test_model_error_is_prefixed_transport_failure() {
        let model = ScriptedModel::new(Script::Error("connection reset".to_string()));
        let orchestrator = FillOrchestrator::new(model.clone());
        let result = orchestrator
            .request_fill("data:image/png;base64,QUJD", "image/png", "")
            .await;

        assert_eq!(
            result,
            FillResult::Failure(FillFailure::transport("connection reset"))
        );
        if let FillResult::Failure(f) = result {
            assert_eq!(f.message(), "Failed to generate image with AI: connection reset");
        }
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_transport_failure() {
        let model = ScriptedModel::new(Script::Stall(Duration::from_secs(5)));
        let orchestrator =
            FillOrchestrator::new(model).with_timeout(Some(Duration::from_millis(20)));

        let result = orchestrator.request_fill("QUJD", "image/png", "").await;
        match result {
            FillResult::Failure(f) => {
                assert_eq!(f.kind, FailureKind::Transport);
                assert!(f.details.contains("timed out"));
            }
            other => panic!("expected timeout failure, got {:?}", other),
        }
    }
}
