pub mod openai;
pub mod traits;

pub use openai::OpenAiChatClient;
pub use traits::{ChatProvider, ChatRequest, ProviderError};
