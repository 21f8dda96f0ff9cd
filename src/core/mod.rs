//! Core types and configuration

pub mod config;
pub mod sample;
