use super::InferenceError;
use crate::constants::{CREDENTIAL_PREFIX, MIN_CREDENTIAL_LENGTH};

/// Checks the shape of an API key without contacting the provider.
pub fn validate_credential(credential: &str) -> Result<(), InferenceError> {
    if credential.starts_with(CREDENTIAL_PREFIX) && credential.len() >= MIN_CREDENTIAL_LENGTH {
        Ok(())
    } else {
        Err(InferenceError::InvalidCredential)
    }
}

/// Mask API key for safe display
pub fn mask_credential(key: &str) -> String {
    if key.len() <= 8 || !key.is_ascii() {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}
