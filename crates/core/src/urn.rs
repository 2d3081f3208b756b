//! Object identifiers and URN encoding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::errors::{ApsError, ApsResult};

/// Prefix of OSS object ids.
pub const OBJECT_ID_PREFIX: &str = "urn:adsk.objects:os.object:";

/// URL-safe base64 of an object id, without padding, as Model Derivative expects.
pub fn urnify(object_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(object_id.as_bytes())
}

/// Inverse of [`urnify`]. Padded input is tolerated.
pub fn decode_urn(urn: &str) -> ApsResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(urn.trim_end_matches('='))
        .map_err(|e| ApsError::BadRequest(format!("无效的URN: {e}")))?;

    String::from_utf8(bytes).map_err(|e| ApsError::BadRequest(format!("无效的URN: {e}")))
}

/// `urn:adsk.objects:os.object:<bucket>/<key>`
pub fn object_id(bucket_key: &str, object_key: &str) -> String {
    format!("{OBJECT_ID_PREFIX}{bucket_key}/{object_key}")
}

/// OSS bucket key rule: 3 to 128 characters from `[-_.a-z0-9]`.
pub fn is_valid_bucket_key(key: &str) -> bool {
    (3..=128).contains(&key.len())
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}
