pub mod catalog_client;
pub mod llm_client;

pub use catalog_client::{CatalogApi, CatalogClient, LookupResponse, SubmitResponse};
pub use llm_client::LlmClient;
