use bytes::Bytes;
use common::errors::ConfigurationError;
use digestllm::{ProviderId, ProviderRequestError, StreamError};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::{Error as HyperError, Response, StatusCode};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("The requested model '{0}' is not served by any provider")]
    UnsupportedModel(String),

    #[error("No API key configured for provider {0}")]
    MissingApiKey(ProviderId),

    #[error("{message}")]
    ForwardedError {
        status_code: StatusCode,
        message: String,
    },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Failed to build upstream request: {0}")]
    RequestBuild(#[from] ProviderRequestError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to create response: {0}")]
    ResponseCreationFailed(#[from] hyper::http::Error),
}

impl SummarizerError {
    pub fn into_response(self) -> Response<BoxBody<Bytes, HyperError>> {
        let (status, code, details) = match &self {
            SummarizerError::InvalidRequest(reason) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                json!({ "reason": reason }),
            ),

            SummarizerError::UnsupportedModel(model) => (
                StatusCode::BAD_REQUEST,
                "UnsupportedModel",
                json!({ "rejected_model_id": model }),
            ),

            SummarizerError::MissingApiKey(provider) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "MissingApiKey",
                json!({ "provider": provider.to_string(), "env": provider.api_key_env() }),
            ),

            SummarizerError::ForwardedError {
                status_code,
                message,
            } => (*status_code, "ForwardedError", json!({ "reason": message })),

            SummarizerError::UpstreamUnavailable(reason) => (
                StatusCode::BAD_GATEWAY,
                "UpstreamUnavailable",
                json!({ "reason": reason }),
            ),

            SummarizerError::Stream(err) => (
                StatusCode::BAD_GATEWAY,
                "StreamError",
                json!({ "reason": err.to_string() }),
            ),

            SummarizerError::RequestBuild(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RequestBuildFailed",
                json!({ "reason": err.to_string() }),
            ),

            SummarizerError::Configuration(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ConfigurationError",
                json!({ "reason": err.to_string() }),
            ),

            SummarizerError::ResponseCreationFailed(reason) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ResponseCreationFailed",
                json!({ "reason": reason.to_string() }),
            ),
        };

        let body_json = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
                "details": details
            }
        });

        let boxed_body = Full::new(Bytes::from(body_json.to_string()))
            .map_err(|never| match never {})
            .boxed();

        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(boxed_body)
            .unwrap_or_else(|_| {
                Response::new(
                    Full::new(Bytes::from("Internal Error"))
                        .map_err(|never| match never {})
                        .boxed(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response<BoxBody<Bytes, HyperError>>) -> serde_json::Value {
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unsupported_model_format() {
        let response = SummarizerError::UnsupportedModel("llama-3".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UnsupportedModel");
        assert_eq!(body["error"]["details"]["rejected_model_id"], "llama-3");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("llama-3"));
    }

    #[tokio::test]
    async fn test_forwarded_error_preserves_status() {
        let err = SummarizerError::ForwardedError {
            status_code: StatusCode::TOO_MANY_REQUESTS,
            message: "Gemini API error: 429 quota exhausted".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "ForwardedError");
        assert_eq!(
            body["error"]["message"],
            "Gemini API error: 429 quota exhausted"
        );
    }

    #[tokio::test]
    async fn test_stream_error_is_bad_gateway() {
        let response = SummarizerError::from(StreamError::MissingBody).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "StreamError");
    }

    #[tokio::test]
    async fn test_missing_api_key_names_env_var() {
        let response = SummarizerError::MissingApiKey(ProviderId::OpenAI).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"]["details"]["env"],
            "OPENAI_API_KEY"
        );
    }
}
