use reqwest::Url;
use thiserror::Error;

/// Input problems caught before anything is stored or sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a URL")]
    EmptyUrl,

    #[error("Please enter a valid URL")]
    InvalidUrl,

    #[error("Username and password required")]
    MissingCredentials,

    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Check that `input` is an absolute http(s) URL with a host.
///
/// Returns the trimmed input as typed, not the normalized form, so the user
/// sees their own URL again when it is restored after login.
pub fn validate_url(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    let parsed = Url::parse(trimmed).map_err(|_| ValidationError::InvalidUrl)?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some_and(|h| !h.is_empty()) => Ok(trimmed.to_string()),
        _ => Err(ValidationError::InvalidUrl),
    }
}
