pub mod cli;
pub mod config;
pub mod models;
pub mod services;
pub mod source;
pub mod web;


pub use config::Config;
