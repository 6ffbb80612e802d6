//! Language model access.

pub mod openai;
pub mod sse;
pub mod stream;

pub use openai::OpenAiCompatibleClient;
pub use stream::{ChatModel, MockChatModel, TokenStream};
