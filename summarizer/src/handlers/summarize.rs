use bytes::Bytes;
use common::consts::REQUEST_ID_HEADER;
use common::errors::ConfigurationError;
use digestllm::ProviderRequestType;
use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::header;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::SummarizerError;
use crate::handlers::utils::{
    create_streaming_response, DeltaProcessor, NdjsonProcessor, PlainTextProcessor,
};
use crate::state::AppState;
use crate::upstream::open_summary_stream;

/// Body of `POST /v1/summaries/stream`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub text: String,
    /// Caller's identifier for the thread, echoed in logs only.
    pub id: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub enable_thinking: bool,
    #[serde(default)]
    pub include_reasoning: bool,
}

pub async fn summarize_stream<B>(
    request: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, hyper::Error>
where
    B: Body,
    B::Error: Display,
{
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = info_span!("summarize", request_id = %request_id);
    let result = handle(request, state, &request_id)
        .instrument(span.clone())
        .await;
    match result {
        Ok(response) => Ok(response),
        Err(err) => {
            span.in_scope(|| warn!(error = %err, "summarize request failed"));
            Ok(err.into_response())
        }
    }
}

async fn handle<B>(
    request: Request<B>,
    state: Arc<AppState>,
    request_id: &str,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, SummarizerError>
where
    B: Body,
    B::Error: Display,
{
    let body_bytes = request
        .into_body()
        .collect()
        .await
        .map_err(|err| SummarizerError::InvalidRequest(format!("failed to read body: {}", err)))?
        .to_bytes();

    let summarize: SummarizeRequest = serde_json::from_slice(&body_bytes)
        .map_err(|err| SummarizerError::InvalidRequest(err.to_string()))?;
    if summarize.text.trim().is_empty() {
        return Err(SummarizerError::InvalidRequest(
            "`text` must not be empty".to_string(),
        ));
    }

    let model = summarize
        .model
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| state.config.default_model());

    let provider = state
        .llm_providers
        .resolve(model)
        .map_err(|err| match err {
            ConfigurationError::UnsupportedModel(model) => SummarizerError::UnsupportedModel(model),
            other => SummarizerError::Configuration(other),
        })?;

    info!(
        thread_id = summarize.id.as_deref().unwrap_or("-"),
        provider = %provider.id,
        model = %provider.model,
        api_key = %provider.masked_key(),
        text_chars = summarize.text.chars().count(),
        enable_thinking = summarize.enable_thinking,
        include_reasoning = summarize.include_reasoning,
        "summarize request"
    );

    let upstream_request = ProviderRequestType::summarize(
        provider.id,
        &provider.model,
        &summarize.text,
        Some(state.config.system_prompt()),
        summarize.enable_thinking,
    );

    let tokens =
        open_summary_stream(&state.client, &provider, &upstream_request).await?;
    debug!(protocol = %tokens.protocol(), "upstream stream opened");
    let channels = tokens.into_channels(state.config.reasoning_markers.clone());

    let streaming_response = if summarize.include_reasoning {
        stream_with(channels, NdjsonProcessor, request_id)
    } else {
        stream_with(channels, PlainTextProcessor, request_id)
    };

    Ok(streaming_response?)
}

fn stream_with<S, E, P>(
    channels: digestllm::ChannelStream<S>,
    processor: P,
    request_id: &str,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, hyper::http::Error>
where
    S: futures::Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + 'static,
    P: DeltaProcessor,
{
    let content_type = processor.content_type();
    let streaming = create_streaming_response(channels, processor, 16);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(REQUEST_ID_HEADER, request_id)
        .body(streaming.body)
}
