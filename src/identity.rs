//! Carrier identity decoding.
//!
//! Labels carry either a bare number (`"12"`) or a link whose last path
//! segment is the number (`"http://host/carrier/12"`). Anything else is some
//! other code in view and has no identity.

use crate::Identity;

pub fn resolve(payload: &str) -> Option<Identity> {
    let tail = match payload.rfind('/') {
        Some(pos) => &payload[pos + 1..],
        None => payload,
    };

    tail.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_number() {
        assert_eq!(resolve("12"), Some(12));
        assert_eq!(resolve(" 7 "), Some(7));
    }

    #[test]
    fn test_link_last_segment() {
        assert_eq!(resolve("http://host/item/7"), Some(7));
        assert_eq!(resolve("https://lager.local/schrank/120"), Some(120));
    }

    #[test]
    fn test_trailing_slash_has_no_identity() {
        assert_eq!(resolve("http://host/item/7/"), None);
    }

    #[test]
    fn test_foreign_codes_ignored() {
        assert_eq!(resolve("hello world"), None);
        assert_eq!(resolve("http://host/item/abc"), None);
        assert_eq!(resolve(""), None);
        assert_eq!(resolve("12.5"), None);
    }
}
