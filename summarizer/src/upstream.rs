use bytes::Bytes;
use common::llm_providers::ResolvedProvider;
use digestllm::{ProviderRequest, ProviderRequestType, StreamingProtocol, TokenStream};
use futures::Stream;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::StatusCode;
use std::pin::Pin;
use tracing::{debug, warn};

use crate::errors::SummarizerError;

pub type UpstreamBody = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

fn auth_headers(
    provider: &ResolvedProvider,
    access_key: &str,
) -> Result<HeaderMap, SummarizerError> {
    let invalid_key = |_: header::InvalidHeaderValue| {
        SummarizerError::InvalidRequest("access key contains invalid characters".to_string())
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    match provider.protocol() {
        StreamingProtocol::Gemini => {
            headers.insert(
                "x-goog-api-key",
                HeaderValue::from_str(access_key).map_err(invalid_key)?,
            );
        }
        StreamingProtocol::OpenAICompatible => {
            let mut bearer =
                HeaderValue::from_str(&format!("Bearer {}", access_key)).map_err(invalid_key)?;
            bearer.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, bearer);
        }
    }
    Ok(headers)
}

/// Send the summarize request and return the decoded token stream.
///
/// A non-success upstream status is returned as a forwarded error carrying
/// the upstream body text.
pub async fn open_summary_stream(
    client: &reqwest::Client,
    provider: &ResolvedProvider,
    request: &ProviderRequestType,
) -> Result<TokenStream<UpstreamBody>, SummarizerError> {
    let access_key = provider
        .access_key
        .as_deref()
        .ok_or(SummarizerError::MissingApiKey(provider.id))?;
    let url = provider.endpoint();
    let body = request.to_bytes()?;

    debug!(url = %url, body_len = body.len(), "sending upstream request");

    let response = client
        .post(&url)
        .headers(auth_headers(provider, access_key)?)
        .body(body)
        .send()
        .await
        .map_err(|err| {
            warn!(error = %err, "upstream request failed");
            SummarizerError::UpstreamUnavailable(err.to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "upstream returned an error");
        return Err(SummarizerError::ForwardedError {
            status_code: StatusCode::from_u16(status.as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            message: format!("{} API error: {} {}", provider.id, status.as_u16(), error_text),
        });
    }

    let body: UpstreamBody = Box::pin(response.bytes_stream());
    Ok(TokenStream::open(
        provider.protocol(),
        status.as_u16(),
        Some(body),
    )?)
}
