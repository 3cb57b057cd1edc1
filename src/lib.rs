pub mod assert;
pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod scope;
pub mod script;
pub mod telemetry;
pub mod template;
