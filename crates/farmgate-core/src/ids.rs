//! Opaque identifier generation for tasks and AI requests.
//!
//! Identifiers are `"<prefix>_<unix millis>_<random>"`. The random part is
//! taken from a v4 UUID, which keeps sequential identifiers created within
//! the same millisecond distinct.

use chrono::Utc;
use uuid::Uuid;

/// Number of random hex characters appended to each identifier
const RANDOM_SUFFIX_LEN: usize = 12;

/// Generate a new identifier with the given prefix.
///
/// ```
/// # use farmgate_core::ids::generate_id;
/// let id = generate_id("task");
/// assert!(id.starts_with("task_"));
/// ```
pub fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, millis, &random[..RANDOM_SUFFIX_LEN])
}
