pub mod commands;
pub mod http;
pub mod manifest;
pub mod registry;
pub mod runtime;
pub mod style;
pub mod verify;
