pub mod config;
pub mod file;
pub mod lines;
pub mod stdin;
