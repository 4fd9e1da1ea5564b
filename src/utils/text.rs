use ammonia;

/// Sanitize and trim user-supplied text before it is stored.
///
/// Uses the ammonia whitelist sanitizer as a fail-safe against stored XSS:
/// captions, comments and bios are plain text, so anything that looks like
/// markup gets stripped. Leading/trailing whitespace is dropped as well.
pub fn clean_text(input: &str) -> String {
    ammonia::clean(input).trim().to_string()
}
