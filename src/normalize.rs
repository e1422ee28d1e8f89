//! Canonical forms for user-supplied pin links and colors.
//!
//! Every function here is pure and total: any input string yields a value,
//! and applying a normalizer to its own output returns the same string.

/// Color given to pins that have none.
pub const DEFAULT_PIN_COLOR: &str = "#e74c3c";

/// Name given to pins confirmed with a blank name.
pub const DEFAULT_PIN_NAME: &str = "Pin";

/// Turns a link into an absolute URL, or the empty string.
///
/// Anything carrying a scheme (`http:`, `mailto:`, `tel:` ...) is kept as is,
/// `//host/path` is promoted to `https://host/path`, and bare hosts get an
/// `https://` prefix.
pub fn normalize_link(input: &str) -> String {
    let link = input.trim();
    if link.is_empty() {
        return String::new();
    }
    if has_scheme(link) {
        return link.to_string();
    }
    if let Some(rest) = link.strip_prefix("//") {
        return format!("https://{rest}");
    }
    format!("https://{link}")
}

/// Turns a color into something a CSS `background` accepts.
///
/// Three or six hex digits, with or without `#`, come back `#`-prefixed.
/// Other non-empty strings (named colors, `rgb(...)`) pass through untouched.
pub fn normalize_color(input: &str) -> String {
    let color = input.trim();
    if color.is_empty() {
        return DEFAULT_PIN_COLOR.to_string();
    }
    let digits = color.strip_prefix('#').unwrap_or(color);
    if is_short_or_long_hex(digits) {
        return format!("#{digits}");
    }
    color.to_string()
}

pub fn normalize_name(input: &str) -> String {
    let name = input.trim();
    if name.is_empty() {
        DEFAULT_PIN_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Decodes the hex form accepted by [`normalize_color`] into RGB bytes.
pub fn parse_hex_color(input: &str) -> Option<[u8; 3]> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !is_short_or_long_hex(digits) {
        return None;
    }
    let nibbles: Vec<u8> = digits
        .chars()
        .filter_map(|c| c.to_digit(16))
        .map(|d| d as u8)
        .collect();
    let rgb = if nibbles.len() == 3 {
        [nibbles[0] * 17, nibbles[1] * 17, nibbles[2] * 17]
    } else {
        [
            nibbles[0] * 16 + nibbles[1],
            nibbles[2] * 16 + nibbles[3],
            nibbles[4] * 16 + nibbles[5],
        ]
    };
    Some(rgb)
}

pub fn format_hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

fn is_short_or_long_hex(digits: &str) -> bool {
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

// scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"
fn has_scheme(link: &str) -> bool {
    let mut chars = link.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for c in chars {
        if c == ':' {
            return true;
        }
        if !(c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_link_stays_empty() {
        assert_eq!(normalize_link(""), "");
        assert_eq!(normalize_link("   \t"), "");
    }

    #[test]
    fn bare_host_gets_https() {
        assert_eq!(normalize_link("example.com"), "https://example.com");
        assert_eq!(
            normalize_link("  example.com/a?b=c  "),
            "https://example.com/a?b=c"
        );
    }

    #[test]
    fn schemes_are_preserved() {
        assert_eq!(normalize_link("http://example.com"), "http://example.com");
        assert_eq!(normalize_link("mailto:a@b.c"), "mailto:a@b.c");
        assert_eq!(normalize_link("tel:+123"), "tel:+123");
        assert_eq!(normalize_link("git+ssh://host/repo"), "git+ssh://host/repo");
    }

    #[test]
    fn protocol_relative_becomes_https() {
        assert_eq!(normalize_link("//cdn.example.com/x"), "https://cdn.example.com/x");
    }

    #[test]
    fn host_with_port_is_not_a_scheme() {
        // "localhost:8080" matches the scheme grammar, same as a browser would read it
        assert_eq!(normalize_link("localhost:8080"), "localhost:8080");
        assert_eq!(normalize_link("1.2.3.4:80"), "https://1.2.3.4:80");
    }

    #[test]
    fn empty_color_defaults() {
        assert_eq!(normalize_color(""), DEFAULT_PIN_COLOR);
        assert_eq!(normalize_color("  "), DEFAULT_PIN_COLOR);
    }

    #[test]
    fn hex_colors_get_hash_prefix() {
        assert_eq!(normalize_color("f00"), "#f00");
        assert_eq!(normalize_color("#f00"), "#f00");
        assert_eq!(normalize_color(" 00FF7a "), "#00FF7a");
    }

    #[test]
    fn other_colors_pass_through() {
        assert_eq!(normalize_color("red"), "red");
        assert_eq!(normalize_color("rgb(1, 2, 3)"), "rgb(1, 2, 3)");
        assert_eq!(normalize_color("#ff00"), "#ff00");
        assert_eq!(normalize_color("ggg"), "ggg");
    }

    #[test]
    fn blank_name_becomes_placeholder() {
        assert_eq!(normalize_name("  "), DEFAULT_PIN_NAME);
        assert_eq!(normalize_name(" Shop "), "Shop");
    }

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(parse_hex_color("#f00"), Some([255, 0, 0]));
        assert_eq!(parse_hex_color("e74c3c"), Some([0xe7, 0x4c, 0x3c]));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(format_hex_color([0xe7, 0x4c, 0x3c]), DEFAULT_PIN_COLOR);
    }

    proptest! {
        #[test]
        fn link_normalization_is_idempotent(input in ".*") {
            let once = normalize_link(&input);
            prop_assert_eq!(normalize_link(&once), once);
        }

        #[test]
        fn color_normalization_is_idempotent(input in ".*") {
            let once = normalize_color(&input);
            prop_assert!(!once.is_empty());
            prop_assert_eq!(normalize_color(&once), once);
        }

        #[test]
        fn hex_inputs_always_parse(digits in "[0-9a-fA-F]{6}") {
            let color = normalize_color(&digits);
            prop_assert!(parse_hex_color(&color).is_some());
        }
    }
}
