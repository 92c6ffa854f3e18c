// src/lib.rs

pub mod api;
pub mod app_state;
pub mod config;
pub mod decode;
pub mod error;
mod log_context;
pub mod model;
pub mod service;
pub mod storage;
pub mod validate;
