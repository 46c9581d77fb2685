//! Mail-address recognition and comparison keys.

use regex::Regex;
use std::sync::OnceLock;

fn mail_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
        )
        .expect("mail regex must compile")
    })
}

/// Whether `token` is a syntactically valid mail address.
///
/// Surrounding whitespace is not tolerated; callers trim first.
pub fn is_mail_address(token: &str) -> bool {
    mail_pattern().is_match(token)
}

/// Comparison key for mail addresses: matching is case-insensitive.
pub fn mail_key(mail: &str) -> String {
    mail.trim().to_lowercase()
}
