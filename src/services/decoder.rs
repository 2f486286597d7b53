//! Resilient decoding of window-manager query output.
//!
//! The query process sometimes prints ANSI noise around the payload and can be
//! read while it is still writing. Truncated output is reported as
//! [`DecodeError::IncompleteOutput`] so the caller can retry; anything else that
//! fails to parse is a [`DecodeError::Parse`].

use crate::error::DecodeError;
use crate::trace_if_enabled;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    // CSI-последовательности и OSC, завершённые BEL или ST
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        // Шаблон константный, ошибка здесь возможна только при правке кода
        .expect("ANSI escape pattern compiles")
});

/// Remove ANSI escape sequences and surrounding whitespace.
pub fn strip_ansi(raw: &str) -> String {
    ANSI_ESCAPE.replace_all(raw, "").trim().to_string()
}

pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, DecodeError> {
    let cleaned = strip_ansi(raw);

    if let Ok(value) = serde_json::from_str::<T>(&cleaned) {
        return Ok(value);
    }

    let envelope = match extract_envelope(&cleaned) {
        Some(envelope) => envelope,
        // Пустой вывод или ни одной скобки: процесс ещё ничего не написал
        None if cleaned.is_empty() => return Err(DecodeError::IncompleteOutput),
        None => return Err(DecodeError::Parse("в выводе нет JSON".to_string())),
    };

    trace_if_enabled!("Извлечён JSON-конверт длиной {}", envelope.text.len());

    if !envelope.is_closed() {
        return Err(DecodeError::IncompleteOutput);
    }

    serde_json::from_str::<T>(envelope.text).map_err(|e| DecodeError::Parse(e.to_string()))
}

struct Envelope<'a> {
    text: &'a str,
    close: char,
}

impl Envelope<'_> {
    /// The envelope ends with its own closing bracket and every bracket
    /// opened inside it (outside of strings) is closed again.
    fn is_closed(&self) -> bool {
        if !self.text.trim_end().ends_with(self.close) {
            return false;
        }

        let mut depth: i64 = 0;
        let mut in_string = false;
        let mut escaped = false;

        for ch in self.text.chars() {
            if in_string {
                match ch {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }

            match ch {
                '"' => in_string = true,
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                _ => {}
            }
        }

        !in_string && depth <= 0
    }
}

/// First opening bracket up to the last matching closing bracket, preferring
/// an array envelope over an object one. Without a closing bracket the
/// envelope runs to the end of the text.
fn extract_envelope(text: &str) -> Option<Envelope<'_>> {
    [('[', ']'), ('{', '}')].into_iter().find_map(|(open, close)| {
        let start = text.find(open)?;
        let end = text
            .rfind(close)
            .filter(|&end| end > start)
            .map(|end| end + close.len_utf8())
            .unwrap_or(text.len());

        Some(Envelope {
            text: &text[start..end],
            close,
        })
    })
}
