pub mod cli;
pub mod commands;
pub mod engine;
pub mod error;
pub mod model;
pub mod ranking;
pub mod search;
pub mod util;
