//! Error types and handling for the WayGo route services

use thiserror::Error;

/// Main error type for the WayGo crate
#[derive(Error, Debug)]
pub enum WayGoError {
    /// The catalog holds no route at all
    #[error("No routes available")]
    NoRoutes,

    /// A route key that is not in the catalog
    #[error("Route not found: {key}")]
    RouteNotFound { key: String },

    /// Directions provider returned a non-success status
    #[error("Directions provider failed with status {status}")]
    Provider { status: String },

    /// Geolocation access was refused by the user or the device
    #[error("Geolocation permission denied")]
    PermissionDenied,

    /// Geolocation failed for another reason
    #[error("Geolocation error: {message}")]
    Geolocation { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Route catalog could not be read or parsed
    #[error("Catalog error: {message}")]
    Catalog { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WayGoError {
    pub fn route_not_found<S: Into<String>>(key: S) -> Self {
        Self::RouteNotFound { key: key.into() }
    }

    pub fn provider<S: Into<String>>(status: S) -> Self {
        Self::Provider {
            status: status.into(),
        }
    }

    pub fn geolocation<S: Into<String>>(message: S) -> Self {
        Self::Geolocation {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn catalog<S: Into<String>>(message: S) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// True for the "nothing to show" family, rendered as an empty state
    #[must_use]
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoRoutes | Self::RouteNotFound { .. })
    }

    /// True when a user-triggered retry makes sense
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::PermissionDenied | Self::Geolocation { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WayGoError::NoRoutes => "No routes are available right now.".to_string(),
            WayGoError::RouteNotFound { key } => format!("The route '{key}' does not exist."),
            WayGoError::Provider { status } => {
                format!("Unable to compute the itinerary ({status}). Please try again.")
            }
            WayGoError::PermissionDenied => {
                "Location access was refused. Enable location to see routes near you.".to_string()
            }
            WayGoError::Geolocation { message } => {
                format!("Unable to access your position: {message}")
            }
            WayGoError::Validation { message } => format!("Invalid input: {message}"),
            WayGoError::Catalog { .. } => {
                "The route catalog could not be loaded. Please check the data file.".to_string()
            }
            WayGoError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            WayGoError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            WayGoError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<serde_json::Error> for WayGoError {
    fn from(err: serde_json::Error) -> Self {
        WayGoError::catalog(err.to_string())
    }
}
