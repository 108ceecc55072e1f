/// Slug used on the wire and in persisted state for "no form type selected".
pub const UNSELECTED_FORM_SLUG: &str = "none";

/// Extension of every document file in the remote store.
pub const REMOTE_FILE_EXTENSION: &str = ".json";

/// Prefix of document fingerprints.
pub const FINGERPRINT_PREFIX: &str = "sha256:";
