use serde::de::DeserializeOwned;

/// Parses JSON bootstrap data embedded alongside a form.
///
/// A missing, empty, or whitespace-only payload is `Ok(None)`; anything else
/// must be valid JSON for `T`.
pub fn extract_payload<T: DeserializeOwned>(raw: Option<&str>) -> serde_json::Result<Option<T>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(raw).map(Some)
}
