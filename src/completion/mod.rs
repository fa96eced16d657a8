//! Language model completions via a local Ollama server

pub mod client;

pub use client::{OllamaChatClient, DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
