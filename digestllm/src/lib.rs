//! digestllm: incremental decoding of streamed LLM responses from Gemini and
//! OpenAI-compatible providers into normalized text tokens, with optional
//! separation of inline reasoning.

pub mod apis;
pub mod clients;
pub mod providers;
// Re-export important types and traits
pub use apis::streaming_shapes::reasoning::{
    ChannelDelta, ReasoningMarkers, ReasoningSplitter, ReasoningState,
};
pub use apis::streaming_shapes::sse::{FrameConvention, FrameSplitter, SseFrame};
pub use apis::streaming_shapes::utf8::Utf8StreamDecoder;
pub use clients::endpoints::{streaming_endpoint, StreamingProtocol};
pub use providers::decoder::StreamDecoder;
pub use providers::id::ProviderId;
pub use providers::request::{ProviderRequest, ProviderRequestError, ProviderRequestType};
pub use providers::streaming_response::{
    DeltaToken, FrameDiagnostic, ProviderStreamResponse, ProviderStreamResponseType, StreamUsage,
    TokenUsage,
};
pub use providers::token_stream::{ChannelStream, StreamError, TokenStream};

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_provider_id_conversion() {
        assert_eq!("gemini".parse::<ProviderId>(), Ok(ProviderId::Gemini));
        assert_eq!("openai".parse::<ProviderId>(), Ok(ProviderId::OpenAI));
        assert_eq!(
            ProviderId::from_model("gpt-4o-mini").map(|p| p.protocol()),
            Some(StreamingProtocol::OpenAICompatible)
        );
    }

    #[tokio::test]
    async fn test_provider_streaming_response() {
        // An OpenAI-compatible body where the provider inlines its reasoning
        let sse_data = "data: {\"id\":\"chatcmpl-123\",\"object\":\"chat.completion.chunk\",\"created\":1694268190,\"model\":\"deepseek-r1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"<think>the user wants\"},\"finish_reason\":null}]}\n\ndata: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\" a summary</think>Hello\"},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n";

        let body = stream::iter(
            sse_data
                .as_bytes()
                .chunks(7)
                .map(|c| Ok::<_, std::io::Error>(Bytes::copy_from_slice(c)))
                .collect::<Vec<_>>(),
        );
        let channels = TokenStream::open(StreamingProtocol::OpenAICompatible, 200, Some(body))
            .unwrap()
            .into_channels(ReasoningMarkers::default());
        let deltas: Vec<ChannelDelta> = channels.map(|d| d.unwrap()).collect().await;

        let reasoning: String = deltas
            .iter()
            .filter(|d| d.is_reasoning())
            .map(|d| d.text())
            .collect();
        let visible: String = deltas
            .iter()
            .filter(|d| !d.is_reasoning())
            .map(|d| d.text())
            .collect();
        assert_eq!(reasoning, "the user wants a summary");
        assert_eq!(visible, "Hello");
    }
}
