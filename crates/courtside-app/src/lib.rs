// Library root: re-exports all modules so integration tests and the binary
// can reach them.

pub mod app;
pub mod config;
pub mod db;
pub mod input;
pub mod protocol;
pub mod render;
