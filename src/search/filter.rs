use once_cell::sync::Lazy;
use regex::Regex;

/// `#<n>` at the very start of the input selects display `n`.
// Константный шаблон: `expect` срабатывает только при ошибке в самом шаблоне
static DISPLAY_FILTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([0-9]+)\s*").expect("display filter pattern compiles"));

pub const MIN_DISPLAY: u32 = 1;
pub const MAX_DISPLAY: u32 = 99;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub display_number: Option<u32>,
    pub remainder: String,
    pub matched: bool,
}

impl FilterResult {
    fn unmatched(raw: &str) -> Self {
        Self {
            display_number: None,
            remainder: raw.to_string(),
            matched: false,
        }
    }
}

/// Split a leading display filter off the search input.
///
/// Only a prefix is recognised: `"app #2"` is plain text. Numbers outside
/// 1..=99 and a bare `#` leave the input untouched.
pub fn parse(raw: &str) -> FilterResult {
    let Some(captures) = DISPLAY_FILTER.captures(raw) else {
        return FilterResult::unmatched(raw);
    };

    let display = captures
        .get(1)
        .and_then(|digits| digits.as_str().parse::<u32>().ok())
        .filter(|n| (MIN_DISPLAY..=MAX_DISPLAY).contains(n));

    match (display, captures.get(0)) {
        (Some(display), Some(whole)) => FilterResult {
            display_number: Some(display),
            remainder: raw[whole.end()..].to_string(),
            matched: true,
        },
        _ => FilterResult::unmatched(raw),
    }
}
