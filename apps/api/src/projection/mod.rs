// Net worth projection: prompts, completion parsing, rendering and the stage
// pipeline that drives them for one session.
// All LLM calls go through llm_client::CompletionClient.

pub mod builder;
pub mod handlers;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod preferences;
pub mod prompts;
pub mod render;
