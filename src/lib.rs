#![forbid(unsafe_code)]

pub mod aggregate;
pub mod app;
pub mod batch;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod feed;
pub mod llm;
pub mod logging;
pub mod mail;
pub mod model;
pub mod openai;
pub mod pipeline;
pub mod prompts;
pub mod store;
pub mod tokens;
