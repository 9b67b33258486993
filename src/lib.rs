pub mod config;
pub mod pulse_core;
pub mod sqlite_pragma;
