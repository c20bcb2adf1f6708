pub mod cache_file;
pub mod resolver;
pub mod settings;

pub use cache_file::{CacheError, CachedConnection, ConnectionCacheFile};
pub use resolver::{
    ConnectionResolver, ConnectionSource, Resolution, SaveOutcome, SetupError, SetupForm,
};
pub use settings::Settings;
