use cpstats_core::SanityBounds;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to move temporary file into place at {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("count {count} for {platform} is outside sanity bounds {bounds}")]
    OutOfBounds {
        platform: String,
        count: u32,
        bounds: SanityBounds,
    },
}
