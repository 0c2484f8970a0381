pub mod chain;
pub mod coin;
pub mod config;
pub mod filter;
pub mod msg;
pub mod plan;
pub mod route;
