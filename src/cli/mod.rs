//! Command-line driver over a seed file.

pub mod commands;
