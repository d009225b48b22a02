//! Concrete provider implementations.

pub mod firecrawl;
pub mod openai;

pub use firecrawl::FirecrawlSearch;
pub use openai::OpenAiProvider;
