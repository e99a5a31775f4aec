// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder bridge

/// All errors that can occur in the alarmdecoder bridge library.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Configuration missing: {what}")]
    ConfigurationMissing { what: String },

    #[error("Invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Panel API call failed: {method} {url} [{status}]")]
    HttpStatus {
        method: String,
        url: String,
        status: u16,
    },

    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Invalid panel response: {details}")]
    InvalidResponse { details: String },

    #[error("Invalid notification request: {details}")]
    InvalidRequest { details: String },

    #[error("Unable to parse notification: {message}")]
    ParseFailure { message: String },

    #[error("Unknown zone: {id}")]
    UnknownZone { id: String },

    #[error("Zone {id} has an unknown type {zone_type}")]
    UnknownZoneType { id: String, zone_type: String },

    #[error("Accessory sink error: {details}")]
    Sink { details: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel closed")]
    ChannelClosed,
}

impl BridgeError {
    /// Whether this error came from talking to the panel controller
    /// (network failure, non-success status, timeout or an unreadable body).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BridgeError::Http(_)
                | BridgeError::HttpStatus { .. }
                | BridgeError::Timeout { .. }
                | BridgeError::InvalidResponse { .. }
                | BridgeError::Io(_)
        )
    }

    /// Whether the error only affects a single event and can be skipped.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            BridgeError::ParseFailure { .. }
                | BridgeError::UnknownZone { .. }
                | BridgeError::UnknownZoneType { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
