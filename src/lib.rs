//! Launch a cloud shell and relay it to the local terminal
pub mod cloudshell;
pub mod config;
pub mod credential;
pub mod error;
pub mod logger;
pub mod relay;
pub mod rest;
pub mod terminal;

pub use error::{Error, Result};
