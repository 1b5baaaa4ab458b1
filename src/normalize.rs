use chrono::NaiveDate;
use serde::Deserialize;

use crate::types::Comic;

/// Raw payload shape served by the origin at `/{id}/info.0.json` and
/// `/info.0.json`. Everything but `num` is optional in practice.
#[derive(Debug, Clone, Deserialize)]
pub struct RawComic {
    pub num: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub safe_title: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub img: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub day: String,
}

/// Convert a raw origin payload into the canonical record.
///
/// Pure and total: identical input always yields a field-for-field identical
/// comic, and missing optional fields fall back to empty strings.
pub fn normalize(raw: &RawComic) -> Comic {
    let title = if raw.title.is_empty() {
        raw.safe_title.clone()
    } else {
        raw.title.clone()
    };

    Comic {
        id: raw.num,
        title,
        alt_text: raw.alt.clone(),
        transcript: raw.transcript.clone(),
        image_url: raw.img.clone(),
        published_date: compose_date(&raw.year, &raw.month, &raw.day),
    }
}

/// Zero-padded `YYYY-MM-DD` composed from the origin's string date fields.
/// Empty when any part is missing or the parts do not form a calendar date.
fn compose_date(year: &str, month: &str, day: &str) -> String {
    let parts = (
        year.trim().parse::<i32>().ok(),
        month.trim().parse::<u32>().ok(),
        day.trim().parse::<u32>().ok(),
    );

    match parts {
        (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y, m, d)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(num: u32) -> RawComic {
        RawComic {
            num,
            title: "A Tree".to_string(),
            safe_title: "A Tree (safe)".to_string(),
            alt: "it's a tree".to_string(),
            transcript: "[[A tree.]]".to_string(),
            img: "https://example.com/tree.png".to_string(),
            year: "2006".to_string(),
            month: "4".to_string(),
            day: "26".to_string(),
        }
    }

    #[test]
    fn normalize_is_deterministic() {
        let input = raw(100);
        assert_eq!(normalize(&input), normalize(&input));
    }

    #[test]
    fn normalize_zero_pads_the_date() {
        let comic = normalize(&raw(100));
        assert_eq!(comic.published_date, "2006-04-26");
    }

    #[test]
    fn normalize_defaults_missing_fields_to_empty() {
        let input = RawComic {
            num: 7,
            title: String::new(),
            safe_title: String::new(),
            alt: String::new(),
            transcript: String::new(),
            img: String::new(),
            year: String::new(),
            month: String::new(),
            day: String::new(),
        };
        let comic = normalize(&input);
        assert_eq!(comic.id, 7);
        assert_eq!(comic.title, "");
        assert_eq!(comic.alt_text, "");
        assert_eq!(comic.transcript, "");
        assert_eq!(comic.published_date, "");
    }

    #[test]
    fn normalize_falls_back_to_safe_title() {
        let mut input = raw(100);
        input.title = String::new();
        assert_eq!(normalize(&input).title, "A Tree (safe)");
    }

    #[test]
    fn compose_date_rejects_impossible_dates() {
        assert_eq!(compose_date("2006", "13", "1"), "");
        assert_eq!(compose_date("2006", "2", "30"), "");
        assert_eq!(compose_date("2006", "x", "1"), "");
    }

    #[test]
    fn raw_payload_deserializes_with_missing_fields() {
        let comic: RawComic =
            serde_json::from_str(r#"{"num": 42, "title": "Answer"}"#).unwrap();
        assert_eq!(comic.num, 42);
        assert_eq!(comic.title, "Answer");
        assert_eq!(comic.year, "");
    }
}
