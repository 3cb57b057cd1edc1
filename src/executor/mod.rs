mod builder;
mod models;
mod runner;

pub use builder::{effective_url, prepare_request};
pub use models::{ResponseData, SentRequest};
pub use runner::{execute, HttpExecutor, DEFAULT_REQUEST_TIMEOUT};
