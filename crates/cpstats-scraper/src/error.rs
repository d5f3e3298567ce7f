use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("malformed API payload from {url}: {reason}")]
    MalformedPayload { url: String, reason: String },

    #[error("pagination limit of {max_pages} pages reached for {url}")]
    PaginationLimit { url: String, max_pages: u32 },

    #[error("unknown platform \"{0}\"")]
    UnknownPlatform(String),

    #[error("invalid endpoint template for {platform}: {reason}")]
    InvalidTemplate { platform: String, reason: String },

    #[error("invalid extraction pattern for {platform} ({pattern}): {reason}")]
    InvalidPattern {
        platform: String,
        pattern: String,
        reason: String,
    },
}
