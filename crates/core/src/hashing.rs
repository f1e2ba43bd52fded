//! Content fingerprints for near-duplicate detection.

use sha2::{Digest, Sha256};

use crate::event::NotificationEvent;

/// Number of leading message characters that participate in the fingerprint.
pub const FINGERPRINT_MESSAGE_CHARS: usize = 100;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Stable digest over user id, event type and the first
/// [`FINGERPRINT_MESSAGE_CHARS`] characters of the message.
///
/// Each field is length-prefixed, so no choice of user id or message text
/// can make two different field tuples hash the same input.
///
/// Two events that differ only in dedupe key, source, channel, metadata or
/// in message text past the prefix share a fingerprint.
pub fn content_fingerprint(event: &NotificationEvent) -> String {
    let prefix: String = event
        .message
        .chars()
        .take(FINGERPRINT_MESSAGE_CHARS)
        .collect();

    let mut hasher = Sha256::new();
    for field in [event.user_id.as_str(), event.event_type.as_str(), prefix.as_str()] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
