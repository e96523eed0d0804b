//! Link detection in chat text

use once_cell::sync::Lazy;
use regex::Regex;

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s<>"']+"#).expect("URL_REGEX should compile - this is a bug")
});

/// Punctuation that ends a sentence rather than a URL
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Returns the first usable http(s) URL in `text`
///
/// Matches that are nothing but a scheme are skipped.
pub fn find_first_url(text: &str) -> Option<&str> {
    URL_REGEX
        .find_iter(text)
        .map(|m| trim_url(m.as_str()))
        .find(|url| !url.ends_with("://"))
}

/// Drops sentence punctuation and unbalanced closing parentheses
fn trim_url(mut url: &str) -> &str {
    loop {
        url = url.trim_end_matches(TRAILING_PUNCTUATION);
        match url.strip_suffix(')') {
            Some(rest) if url.matches(')').count() > url.matches('(').count() => url = rest,
            _ => return url,
        }
    }
}
