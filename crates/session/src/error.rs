use surface::SurfaceError;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The operation needs a live surface; call `init` first.
    NotInitialized,
    AlreadyInitialized,
    /// The session was destroyed and cannot be used again.
    Destroyed,
    Config(ConfigError),
    Surface(SurfaceError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotInitialized => write!(f, "map session is not initialized"),
            SessionError::AlreadyInitialized => write!(f, "map session is already initialized"),
            SessionError::Destroyed => write!(f, "map session has been destroyed"),
            SessionError::Config(e) => write!(f, "{e}"),
            SessionError::Surface(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Config(e) => Some(e),
            SessionError::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SurfaceError> for SessionError {
    fn from(e: SurfaceError) -> Self {
        SessionError::Surface(e)
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        SessionError::Config(e)
    }
}
