//! HTTP surface for the fill orchestrator.
//!
//! Every hosting platform implements [`HostAdapter`] (parse its own request
//! type, format its own response type) and shares [`invoke_core`].

use crate::fill_service::{FillOrchestrator, FillRequest, FillResult, ImageModel};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const MISSING_FIELDS: &str = "Missing base64Image or mimeType in request body";
pub const INVALID_JSON: &str = "Request body is not valid JSON";
pub const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    base64_image: Option<String>,
    mime_type: Option<String>,
    user_prompt: Option<String>,
}

/// Platform-neutral response: status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateReply {
    pub status: u16,
    pub body: Value,
}

impl GenerateReply {
    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }
}

/// Validates method and body of a `/generate` call.
pub fn parse_generate(method: &str, body: &[u8]) -> Result<FillRequest, GenerateReply> {
    if !method.eq_ignore_ascii_case("POST") {
        return Err(GenerateReply::error(405, METHOD_NOT_ALLOWED));
    }

    let parsed: GenerateBody = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateBody::default()
    } else {
        serde_json::from_slice(body).map_err(|e| {
            log::warn!("⚠ Rejecting request with invalid JSON: {}", e);
            GenerateReply::error(400, INVALID_JSON)
        })?
    };

    match (parsed.base64_image, parsed.mime_type) {
        (Some(encoded_image), Some(mime_type)) if !encoded_image.is_empty() && !mime_type.is_empty() => {
            Ok(FillRequest {
                encoded_image,
                mime_type,
                user_prompt: parsed.user_prompt.unwrap_or_default(),
            })
        }
        _ => Err(GenerateReply::error(400, MISSING_FIELDS)),
    }
}

pub fn reply_for(result: FillResult) -> GenerateReply {
    match result {
        FillResult::Success { encoded_image } => GenerateReply {
            status: 200,
            body: json!({ "finalImageSrc": encoded_image }),
        },
        FillResult::Failure(failure) => GenerateReply {
            status: 500,
            body: json!({ "error": failure.headline(), "details": failure.details }),
        },
    }
}

pub async fn invoke_core<M: ImageModel>(
    orchestrator: &FillOrchestrator<M>,
    request: FillRequest,
) -> GenerateReply {
    reply_for(orchestrator.fill(&request).await)
}

pub trait HostAdapter {
    type Request;
    type Response;

    fn parse_request(&self, request: Self::Request) -> Result<FillRequest, GenerateReply>;

    fn format_response(&self, reply: GenerateReply) -> Self::Response;
}

/// parse → invoke → format, for any platform.
pub async fn serve_request<A: HostAdapter, M: ImageModel>(
    adapter: &A,
    orchestrator: &FillOrchestrator<M>,
    request: A::Request,
) -> A::Response {
    let reply = match adapter.parse_request(request) {
        Ok(fill_request) => invoke_core(orchestrator, fill_request).await,
        Err(reply) => reply,
    };
    if reply.status >= 500 {
        log::error!("❌ /generate -> {}: {}", reply.status, reply.body);
    } else {
        log::info!("📨 /generate -> {}", reply.status);
    }
    adapter.format_response(reply)
}

/// Long-running server hosted by axum.
pub struct AxumAdapter;

impl HostAdapter for AxumAdapter {
    type Request = (Method, Bytes);
    type Response = Response;

    fn parse_request(&self, (method, body): (Method, Bytes)) -> Result<FillRequest, GenerateReply> {
        parse_generate(method.as_str(), &body)
    }

    fn format_response(&self, reply: GenerateReply) -> Response {
        let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(reply.body)).into_response()
    }
}

async fn generate_handler<M: ImageModel + 'static>(
    State(orchestrator): State<Arc<FillOrchestrator<M>>>,
    method: Method,
    body: Bytes,
) -> Response {
    serve_request(&AxumAdapter, &orchestrator, (method, body)).await
}

pub fn router<M: ImageModel + 'static>(orchestrator: Arc<FillOrchestrator<M>>) -> Router {
    Router::new()
        .route("/generate", any(generate_handler::<M>))
        .route("/api/generate", any(generate_handler::<M>))
        .with_state(orchestrator)
}

/// Serverless function invocation: one JSON event in, one JSON response out.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    pub http_method: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub struct FunctionAdapter;

impl HostAdapter for FunctionAdapter {
    type Request = FunctionEvent;
    type Response = FunctionResponse;

    fn parse_request(&self, event: FunctionEvent) -> Result<FillRequest, GenerateReply> {
        parse_generate(&event.http_method, event.body.unwrap_or_default().as_bytes())
    }

    fn format_response(&self, reply: GenerateReply) -> FunctionResponse {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        FunctionResponse {
            status_code: reply.status,
            headers,
            body: reply.body.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill_service::testing::{Script, ScriptedModel};
    use crate::fill_service::BASE_INSTRUCTION;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_non_post_is_405() {
        let reply = parse_generate("GET", b"").unwrap_err();
        assert_eq!(reply.status, 405);
        assert_eq!(reply.body, json!({ "error": "Method Not Allowed" }));
    }

    #[test]
    fn test_missing_fields_is_400() {
        for payload in [
            json!({}),
            json!({ "base64Image": "data:image/png;base64,QUJD" }),
            json!({ "mimeType": "image/png" }),
            json!({ "base64Image": "", "mimeType": "image/png" }),
        ] {
            let reply = parse_generate("POST", &body(payload)).unwrap_err();
            assert_eq!(reply.status, 400);
            assert_eq!(reply.body["error"], MISSING_FIELDS);
        }
        assert_eq!(parse_generate("POST", b"").unwrap_err().status, 400);
    }

    #[test]
    fn test_invalid_json_is_400() {
        let reply = parse_generate("POST", b"{ nope").unwrap_err();
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["error"], INVALID_JSON);
    }

    #[test]
    fn test_prompt_defaults_to_empty() {
        let request = parse_generate(
            "post",
            &body(json!({ "base64Image": "data:image/png;base64,QUJD", "mimeType": "image/png" })),
        )
        .unwrap();
        assert_eq!(request.user_prompt, "");
        assert_eq!(request.instruction(), BASE_INSTRUCTION);
    }

    #[tokio::test]
    async fn test_function_adapter_success() {
        let model = ScriptedModel::image("image/png", "T1VU");
        let orchestrator = FillOrchestrator::new(model.clone());
        let event = FunctionEvent {
            http_method: "POST".to_string(),
            body: Some(
                json!({
                    "base64Image": "data:image/jpeg;base64,SU4=",
                    "mimeType": "image/jpeg",
                    "userPrompt": "sunset"
                })
                .to_string(),
            ),
        };

        let response = serve_request(&FunctionAdapter, &orchestrator, event).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers["Content-Type"], "application/json");
        let parsed: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(parsed, json!({ "finalImageSrc": "data:image/png;base64,T1VU" }));

        let seen = model.seen();
        assert_eq!(seen[0].0.data, "SU4=");
        assert!(seen[0].1.ends_with("\"sunset\""));
    }

    #[tokio::test]
    async fn test_refusal_and_failure_are_500_with_details() {
        let refusing = FillOrchestrator::new(ScriptedModel::text("Not allowed"));
        let reply = invoke_core(
            &refusing,
            FillRequest {
                encoded_image: "QUJD".to_string(),
                mime_type: "image/png".to_string(),
                user_prompt: String::new(),
            },
        )
        .await;
        assert_eq!(reply.status, 500);
        assert_eq!(
            reply.body,
            json!({
                "error": "AI did not return an image. It might have refused the request.",
                "details": "Not allowed"
            })
        );

        let broken = FillOrchestrator::new(ScriptedModel::new(Script::Error("dns failure".to_string())));
        let reply = invoke_core(
            &broken,
            FillRequest {
                encoded_image: "QUJD".to_string(),
                mime_type: "image/png".to_string(),
                user_prompt: String::new(),
            },
        )
        .await;
        assert_eq!(reply.status, 500);
        assert_eq!(reply.body["error"], "Failed to generate image with AI.");
        assert_eq!(reply.body["details"], "dns failure");
    }

    #[tokio::test]
    async fn test_rejected_request_never_reaches_model() {
        let model = ScriptedModel::image("image/png", "T1VU");
        let orchestrator = FillOrchestrator::new(model.clone());
        let event = FunctionEvent {
            http_method: "PUT".to_string(),
            body: None,
        };
        let response = serve_request(&FunctionAdapter, &orchestrator, event).await;
        assert_eq!(response.status_code, 405);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_axum_router_end_to_end() {
        let orchestrator = Arc::new(FillOrchestrator::new(ScriptedModel::image("image/png", "T1VU")));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(orchestrator)).await.unwrap();
        });

        let client = reqwest::Client::new();
        let ok = client
            .post(format!("http://{}/generate", addr))
            .json(&json!({ "base64Image": "data:image/png;base64,QUJD", "mimeType": "image/png" }))
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status().as_u16(), 200);
        let payload: Value = ok.json().await.unwrap();
        assert_eq!(payload["finalImageSrc"], "data:image/png;base64,T1VU");

        let wrong_method = client
            .get(format!("http://{}/api/generate", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(wrong_method.status().as_u16(), 405);
    }
}
