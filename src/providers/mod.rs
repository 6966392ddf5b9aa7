//! Generative Model Provider Module
//!
//! A unified interface over hosted image/text models. The generation client
//! only talks to `GenerativeModel`; Gemini is the one concrete provider.
//!
//! ```text
//!   GenerationClient ──► GenerativeModel ──► GeminiProvider ──► RateLimitedClient
//! ```

pub mod traits;
pub mod http_client;
pub mod gemini;

#[cfg(test)]
pub mod scripted;

// Re-export commonly used types
pub use traits::{
    ContentRequest,
    GenerativeModel,
    ImagePrompt,
    InlineImage,
    ModelReply,
    ModelTask,
    Part,
    ProviderCredentials,
    ProviderError,
    ProviderFactory,
};
