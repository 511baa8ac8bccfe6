pub mod cache;
pub mod config;
pub mod error;
pub mod matcher;
pub mod mcp_api;
pub mod model;
pub mod normalize;
pub mod resolver;
pub mod rewriter;
pub mod scanner;
