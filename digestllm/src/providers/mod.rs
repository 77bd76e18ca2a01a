//! Provider implementations for the supported streaming APIs
//!
//! This module holds provider identification, request construction and the
//! decoding of streaming responses into normalized tokens.
//!
pub mod decoder;
pub mod id;
pub mod request;
pub mod streaming_response;
pub mod token_stream;

pub use decoder::StreamDecoder;
pub use id::ProviderId;
pub use request::{ProviderRequest, ProviderRequestError, ProviderRequestType};
pub use streaming_response::{
    DeltaToken, FrameDiagnostic, ProviderStreamResponse, ProviderStreamResponseType, StreamUsage,
    TokenUsage,
};
pub use token_stream::{ChannelStream, StreamError, TokenStream};
