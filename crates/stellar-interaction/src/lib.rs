//! HTTP collaborators: profile generation and text generation.

mod http_error;
pub mod openai_text_generator;
pub mod roxy_profile_client;

pub use openai_text_generator::OpenAiTextGenerator;
pub use roxy_profile_client::RoxyProfileClient;
