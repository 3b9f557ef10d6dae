//! Configuration access port trait.

use crate::domain::error::PortsimError;

/// Read access to sectioned `key = value` settings.
///
/// Values come back as raw strings; typed parsing lives in
/// `config_validation` so malformed values are rejected, never defaulted.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// A non-blank string value, or `ConfigMissing`.
    fn require_string(&self, section: &str, key: &str) -> Result<String, PortsimError> {
        match self.get_string(section, key) {
            Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Err(PortsimError::missing(section, key)),
        }
    }
}
