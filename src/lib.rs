pub mod assembler;
pub mod config;
pub mod errors;
pub mod filter;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod sources;
pub mod validator;
