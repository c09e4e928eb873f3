#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod history;
pub mod logging;
pub mod model;
pub mod provider;
pub mod summary;
