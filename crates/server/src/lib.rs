//! HTTP transport for the HR inference service

pub mod api;
pub mod config;
