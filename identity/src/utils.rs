//! Input helpers for the identity lifecycle.

/// Parse a device name from a user agent string.
///
/// Used to name the device in the "new login detected" email. Deliberately
/// coarse: mobile, tablet, or web.
///
/// # Examples
///
/// ```
/// use warden_identity::utils::parse_device_name;
///
/// assert_eq!(parse_device_name("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"), "Mobile Browser");
/// assert_eq!(parse_device_name("Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)"), "Tablet Browser");
/// assert_eq!(parse_device_name("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"), "Web Browser");
/// ```
#[must_use]
pub fn parse_device_name(user_agent: &str) -> &'static str {
    let ua = user_agent.to_lowercase();

    if ua.contains("ipad") || ua.contains("tablet") {
        return "Tablet Browser";
    }
    if ua.contains("iphone") || ua.contains("android") {
        return "Mobile Browser";
    }
    if ua.trim().is_empty() {
        return "Unknown device";
    }
    "Web Browser"
}

/// Validate a username.
///
/// At least 3 characters, starts with an ASCII letter, contains only letters,
/// digits, or hyphens, and ends with a letter or digit.
///
/// # Examples
///
/// ```
/// use warden_identity::utils::is_valid_username;
///
/// assert!(is_valid_username("ann1"));
/// assert!(is_valid_username("ann-marie"));
/// assert!(!is_valid_username("1ann"));
/// assert!(!is_valid_username("ann-"));
/// assert!(!is_valid_username("an"));
/// ```
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    let bytes = username.as_bytes();
    if bytes.len() < 3 {
        return false;
    }

    let first_ok = bytes[0].is_ascii_alphabetic();
    let last_ok = bytes[bytes.len() - 1].is_ascii_alphanumeric();
    let body_ok = bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || *b == b'-');

    first_ok && last_ok && body_ok
}

/// Validate email address format.
///
/// Basic structural validation:
/// - Exactly one `@`
/// - Non-empty local part; domain with at least one dot and no empty labels
/// - Length between 3 and 255 characters
///
/// # Examples
///
/// ```
/// use warden_identity::utils::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("user+tag@subdomain.example.com"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("@example.com"));
/// assert!(!is_valid_email("user@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }

    let local_ok = local
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'));
    let domain_ok = domain
        .split('.')
        .all(|label| !label.is_empty() && label.chars().all(|c| c.is_alphanumeric() || c == '-'));

    local_ok && domain_ok
}

/// Whether `url` is an absolute `http`/`https` URL with a host.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    rest.is_some_and(|rest| {
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        !host.is_empty() && !rest.chars().any(char::is_whitespace)
    })
}

/// Username for an account created by federated login.
///
/// Lower-cased display name with whitespace removed, suffixed with a
/// millisecond timestamp.
///
/// # Examples
///
/// ```
/// use warden_identity::utils::social_username;
///
/// assert_eq!(social_username("Ann Marie Lee", 1_700_000_000_000), "annmarielee1700000000000");
/// ```
#[must_use]
pub fn social_username(name: &str, timestamp_millis: i64) -> String {
    let base: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    format!("{base}{timestamp_millis}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_device_name() {
        assert_eq!(parse_device_name("Mozilla/5.0 (Linux; Android 13)"), "Mobile Browser");
        assert_eq!(parse_device_name("Mozilla/5.0 (Linux; Android 13; Tablet)"), "Tablet Browser");
        assert_eq!(parse_device_name("Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0)"), "Web Browser");
        assert_eq!(parse_device_name(""), "Unknown device");
    }

    #[test]
    fn test_usernames() {
        assert!(is_valid_username("abc"));
        assert!(is_valid_username("a-b-c9"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("-abc"));
        assert!(!is_valid_username("ab_c"));
        assert!(!is_valid_username("añb"));
    }

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user.name@example.com"));
        assert!(is_valid_email("user_name@subdomain.example.com"));
        assert!(is_valid_email("a@b.c"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("user@example..com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email(&format!("{}@example.com", "a".repeat(250))));
    }

    #[test]
    fn test_urls() {
        assert!(is_valid_url("https://cdn.example.com/a.png"));
        assert!(is_valid_url("http://localhost:3000"));
        assert!(!is_valid_url("ftp://example.com/a.png"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("https://exa mple.com"));
        assert!(!is_valid_url("javascript:alert(1)"));
    }

    proptest! {
        #[test]
        fn prop_social_username_has_no_whitespace(name in "[A-Za-z ]{0,24}", ts in 0i64..i64::MAX) {
            let username = social_username(&name, ts);
            prop_assert!(!username.chars().any(char::is_whitespace));
            prop_assert!(username.ends_with(&ts.to_string()));
            prop_assert!(!username.chars().any(|c| c.is_ascii_uppercase()));
        }
    }
}
