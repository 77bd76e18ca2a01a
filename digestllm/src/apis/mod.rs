pub mod gemini;
pub mod openai;
pub mod streaming_shapes;

// Explicit exports to avoid naming conflicts
pub use gemini::{GenerateContentRequest, GenerateContentStreamResponse};
pub use gemini::{Content as GeminiContent, Part as GeminiPart};
pub use openai::{ChatCompletionsRequest, ChatCompletionsStreamResponse};
pub use openai::{Message as OpenAIMessage, Role as OpenAIRole};
