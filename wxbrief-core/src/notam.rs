//! NOTAM and SIGMET line decoders, plus runway-condition lookup from NOTAM text.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotamEntry {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigmetEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub raw: String,
    pub details: String,
}

/// Split each line on its first whitespace run into identifier and text.
pub fn decode_notam<S: AsRef<str>>(lines: &[S]) -> Vec<NotamEntry> {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (id, text) = split_first_token(line);
            NotamEntry {
                id: id.to_string(),
                text: text.to_string(),
            }
        })
        .collect()
}

/// Split each line into its type token and the remaining details.
pub fn decode_sigmet<S: AsRef<str>>(lines: &[S]) -> Vec<SigmetEntry> {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (kind, details) = split_first_token(line);
            SigmetEntry {
                kind: kind.to_string(),
                raw: line.to_string(),
                details: details.to_string(),
            }
        })
        .collect()
}

fn split_first_token(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (line, ""),
    }
}

// ---------------------------------------------------------------------------
// Runway condition
// ---------------------------------------------------------------------------

pub const CONDITION_NOT_REPORTED: &str = "Not reported";

/// Keyword to reported surface condition, checked in order.
const CONDITION_KEYWORDS: &[(&str, &str)] = &[
    ("CLOSED", "Closed"),
    ("CLSD", "Closed"),
    ("WET", "Wet"),
    ("WATER", "Standing water reported"),
    ("SNOW", "Contaminated (snow)"),
    ("ICE", "Icy"),
    ("RUBBER", "Rubber deposits reported"),
    ("BRAKING ACTION", "Braking action advisory"),
];

/// Surface condition for `designator` from the station's NOTAM texts.
///
/// A keyword counts when the NOTAMs mention this runway or runways in general.
pub fn runway_condition<S: AsRef<str>>(designator: &str, notam_texts: &[S]) -> &'static str {
    let text = notam_texts
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    let runway_key: String = designator
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let in_scope =
        (!runway_key.is_empty() && text.contains(&runway_key)) || text.contains("RWY") || text.contains("RUNWAY");
    if !in_scope {
        return CONDITION_NOT_REPORTED;
    }
    CONDITION_KEYWORDS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, label)| *label)
        .unwrap_or(CONDITION_NOT_REPORTED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_notam_lines() {
        let entries = decode_notam(&["A0123/26 RWY 03L/21R CLSD 0600-1400", "", "B0044/26\tTWY B WIP"]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "A0123/26");
        assert_eq!(entries[0].text, "RWY 03L/21R CLSD 0600-1400");
        assert_eq!(entries[1].text, "TWY B WIP");
    }

    #[test]
    fn test_decode_single_token_line() {
        let entries = decode_notam(&["NIL"]);
        assert_eq!(entries[0].id, "NIL");
        assert_eq!(entries[0].text, "");
    }

    #[test]
    fn test_decode_sigmet_lines() {
        let entries = decode_sigmet(&["SIGMET A1 VALID 121000/121400 FAJA EMBD TS OBS"]);
        assert_eq!(entries[0].kind, "SIGMET");
        assert_eq!(entries[0].details, "A1 VALID 121000/121400 FAJA EMBD TS OBS");
        assert_eq!(entries[0].raw, "SIGMET A1 VALID 121000/121400 FAJA EMBD TS OBS");
    }

    #[test]
    fn test_runway_condition_keywords() {
        assert_eq!(runway_condition("03L", &["RWY 03L CLSD"]), "Closed");
        assert_eq!(runway_condition("21R", &["RWY 03L/21R WET"]), "Wet");
        assert_eq!(runway_condition("03L", &["RUNWAY SURFACE ICE PATCHES"]), "Icy");
        assert_eq!(runway_condition("03L", &["RWY BRAKING ACTION MEDIUM"]), "Braking action advisory");
    }

    #[test]
    fn test_runway_condition_not_reported() {
        assert_eq!(runway_condition("03L", &["TWY B CLSD"]), CONDITION_NOT_REPORTED);
        let empty: [&str; 0] = [];
        assert_eq!(runway_condition("03L", &empty), CONDITION_NOT_REPORTED);
        assert_eq!(runway_condition("03L", &["RWY 03L ILS U/S"]), CONDITION_NOT_REPORTED);
    }
}
