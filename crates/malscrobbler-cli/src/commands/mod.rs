pub mod check;
pub mod config;
pub mod prompts;
pub mod serve;
