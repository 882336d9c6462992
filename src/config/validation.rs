use crate::config::schema::API_KEY_VAR;
use crate::error::{AgentQlError, Result};

/// The API key must be present and non-blank.
pub fn validate_api_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(AgentQlError::Config(format!(
            "{} environment variable is required",
            API_KEY_VAR
        )));
    }
    Ok(())
}

/// Validate the API host format
pub fn validate_api_host(host: &str) -> Result<()> {
    if !host.starts_with("http://") && !host.starts_with("https://") {
        return Err(AgentQlError::Config(format!(
            "Invalid API host: {}. Must start with http:// or https://",
            host
        )));
    }
    Ok(())
}
