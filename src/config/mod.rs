mod loader;

pub use loader::{load_config, EngineConfig, LoadedConfig, CONFIG_FILE_NAME};
