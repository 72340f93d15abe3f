use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::models::MealReport;

lazy_static! {
    // First ```json fence, closed by the nearest ``` after it
    static ref FENCED_JSON: Regex =
        Regex::new(r"(?s)```json(.*?)```").expect("fenced JSON pattern should be valid");
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No valid JSON found in model response")]
    NoPayload,
    #[error("Invalid nutrition payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Pull the fenced JSON payload out of a model answer and decode it.
///
/// Decoding is attempted strictly first. When that fails the `reply` value is
/// repaired (control characters and their escapes turned into spaces) and the
/// payload is decoded again. Either way the returned `reply` never contains a
/// newline, carriage return or tab.
///
/// The decoded reply is always run through [`sanitize_reply_text`], so a literal
/// backslash followed by `n`, `r` or `t` (e.g. `C:\new`) also becomes a space.
pub fn extract(raw: &str) -> Result<MealReport, ExtractionError> {
    let payload = find_fenced_payload(raw).ok_or(ExtractionError::NoPayload)?;
    log::debug!("📄 Raw model payload:\n{}", payload);

    let mut report = match serde_json::from_str::<MealReport>(payload) {
        Ok(report) => report,
        Err(e) => {
            log::debug!("🔧 Strict decode failed ({}), repairing reply field", e);
            serde_json::from_str::<MealReport>(&repair_reply_fields(payload))?
        }
    };

    report.reply = sanitize_reply_text(&report.reply);
    Ok(report)
}

/// Trimmed contents of the first ```json fenced block, if any
pub fn find_fenced_payload(raw: &str) -> Option<&str> {
    FENCED_JSON
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Replace `\n`, `\r`, `\t` escapes and literal LF, CR, TAB with a space.
///
/// Output never contains any of those sequences, so applying it twice is the
/// same as applying it once.
pub fn sanitize_reply_text(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if matches!(chars.get(i + 1), Some('n' | 'r' | 't')) => {
                out.push(' ');
                i += 2;
            }
            '\n' | '\r' | '\t' => {
                out.push(' ');
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Rewrite every string value keyed by `"reply"` so it no longer holds raw
/// control characters, leaving the rest of the payload byte-for-byte intact.
///
/// Scans with quote/escape tracking, so escaped quotes inside the reply and
/// other string fields that merely contain the word `reply` are handled.
pub fn repair_reply_fields(payload: &str) -> String {
    let chars: Vec<char> = payload.chars().collect();
    let mut out = String::with_capacity(payload.len());
    let mut reply_value_next = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c != '"' {
            if !c.is_whitespace() && c != ':' {
                reply_value_next = false;
            }
            out.push(c);
            i += 1;
            continue;
        }

        if reply_value_next {
            i = copy_sanitized_string(&chars, i, &mut out);
            reply_value_next = false;
        } else {
            let (end, content) = scan_string(&chars, i);
            out.extend(&chars[i..end]);
            reply_value_next = content == "reply" && next_significant(&chars, end) == Some(':');
            i = end;
        }
    }

    out
}

/// Returns the index just past the closing quote and the raw string content
fn scan_string(chars: &[char], start: usize) -> (usize, String) {
    let mut content = String::new();
    let mut j = start + 1;

    while j < chars.len() {
        match chars[j] {
            '\\' => {
                content.push('\\');
                if let Some(&next) = chars.get(j + 1) {
                    content.push(next);
                }
                j += 2;
            }
            '"' => return (j + 1, content),
            c => {
                content.push(c);
                j += 1;
            }
        }
    }

    (chars.len(), content)
}

fn copy_sanitized_string(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut j = start + 1;

    while j < chars.len() {
        match chars[j] {
            '\\' => match chars.get(j + 1) {
                Some('n' | 'r' | 't') => {
                    out.push(' ');
                    j += 2;
                }
                Some(&next) => {
                    out.push('\\');
                    out.push(next);
                    j += 2;
                }
                None => {
                    out.push('\\');
                    j += 1;
                }
            },
            '"' => {
                out.push('"');
                return j + 1;
            }
            '\n' | '\r' | '\t' => {
                out.push(' ');
                j += 1;
            }
            c => {
                out.push(c);
                j += 1;
            }
        }
    }

    chars.len()
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(payload: &str) -> String {
        format!("Here is your estimate:\n\n```json\n{}\n```\nEnjoy!", payload)
    }

    #[test]
    fn test_extract_clean_payload() {
        let raw = wrap(
            r#"{
  "calories": 220,
  "protein_g": 6,
  "carbs_g": 30,
  "fat_g": 8,
  "reply": "Nice! Light and energizing!"
}"#,
        );

        let report = extract(&raw).unwrap();

        assert_eq!(
            report,
            MealReport {
                calories: 220.0,
                protein_g: 6.0,
                carbs_g: 30.0,
                fat_g: 8.0,
                reply: "Nice! Light and energizing!".to_string(),
            }
        );
    }

    #[test]
    fn test_extract_reply_with_literal_newline() {
        let raw = wrap("{\"calories\": 410, \"protein_g\": 22.5, \"carbs_g\": 35, \"fat_g\": 18, \"reply\": \"Great job!\nKeep going!\"}");

        let report = extract(&raw).unwrap();

        assert_eq!(report.reply, "Great job! Keep going!");
        assert_eq!(report.calories, 410.0);
        assert_eq!(report.protein_g, 22.5);
        assert_eq!(report.carbs_g, 35.0);
        assert_eq!(report.fat_g, 18.0);
    }

    #[test]
    fn test_extract_reply_with_tabs_and_escapes() {
        let raw = wrap("{\"calories\": 100, \"protein_g\": 1, \"carbs_g\": 2, \"fat_g\": 3, \"reply\": \"One\\nTwo\tThree\r\nFour\"}");

        let report = extract(&raw).unwrap();

        assert!(!report.reply.contains(['\n', '\r', '\t']));
        assert_eq!(report.reply, "One Two Three  Four");
    }

    #[test]
    fn test_extract_keeps_escaped_quotes_in_reply() {
        let raw = wrap("{\"calories\": 300, \"protein_g\": 10, \"carbs_g\": 20, \"fat_g\": 5, \"reply\": \"That \\\"snack\\\" was\nfine\"}");

        let report = extract(&raw).unwrap();

        assert_eq!(report.reply, "That \"snack\" was fine");
    }

    #[test]
    fn test_extract_strict_path_still_sanitizes_backslash_sequences() {
        let raw = wrap(r#"{"calories": 1, "protein_g": 1, "carbs_g": 1, "fat_g": 1, "reply": "Saved to C:\\new folder"}"#);

        let report = extract(&raw).unwrap();

        assert_eq!(report.reply, "Saved to C: ew folder");
    }

    #[test]
    fn test_extract_without_fence_fails() {
        let raw = r#"{"calories": 220, "protein_g": 6, "carbs_g": 30, "fat_g": 8, "reply": "hi"}"#;

        assert!(matches!(extract(raw), Err(ExtractionError::NoPayload)));
    }

    #[test]
    fn test_extract_wrong_type_reports_decode_error() {
        let raw = wrap(r#"{"calories": "lots", "protein_g": 6, "carbs_g": 30, "fat_g": 8, "reply": "hi"}"#);

        let err = extract(&raw).unwrap_err();

        assert!(matches!(err, ExtractionError::Decode(_)));
        assert!(err.to_string().starts_with("Invalid nutrition payload"));
    }

    #[test]
    fn test_extract_missing_field_fails() {
        let raw = wrap(r#"{"calories": 220, "protein_g": 6, "carbs_g": 30, "reply": "hi"}"#);

        assert!(matches!(extract(&raw), Err(ExtractionError::Decode(_))));
    }

    #[test]
    fn test_only_first_fence_is_used() {
        let raw = format!(
            "{}\nAlternative:\n```json\n{{\"calories\": 999, \"protein_g\": 0, \"carbs_g\": 0, \"fat_g\": 0, \"reply\": \"second\"}}\n```",
            wrap(r#"{"calories": 120, "protein_g": 3, "carbs_g": 20, "fat_g": 2, "reply": "first"}"#)
        );

        let report = extract(&raw).unwrap();

        assert_eq!(report.calories, 120.0);
        assert_eq!(report.reply, "first");
    }

    #[test]
    fn test_find_fenced_payload_trims() {
        let raw = "```json\n\n  {\"a\": 1}  \n\n```";
        assert_eq!(find_fenced_payload(raw), Some("{\"a\": 1}"));
        assert_eq!(find_fenced_payload("no fences here"), None);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "plain reply",
            "Great job!\nKeep going!",
            "tabs\tand\\tescapes\\r\\n",
            "double backslash \\\\n edge",
            "trailing backslash \\",
        ];

        for sample in samples {
            let once = sanitize_reply_text(sample);
            assert_eq!(sanitize_reply_text(&once), once, "sample: {:?}", sample);
            assert!(!once.contains(['\n', '\r', '\t']));
        }
    }

    #[test]
    fn test_repair_touches_only_reply_value() {
        let payload = "{\"note\": \"reply\", \"calories\": 5, \"reply\": \"a\nb\"}";

        let repaired = repair_reply_fields(payload);

        assert_eq!(repaired, "{\"note\": \"reply\", \"calories\": 5, \"reply\": \"a b\"}");
    }

    #[test]
    fn test_repair_leaves_other_strings_alone() {
        let payload = "{\"comment\": \"x\ny\", \"reply\": \"ok\"}";

        assert_eq!(repair_reply_fields(payload), payload);
    }
}
