#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod docs;
pub mod formats;
pub mod logging;
pub mod markdown;
pub mod normalize;
pub mod patch;
pub mod search;
pub mod style;
pub mod substitute;
pub mod template;
