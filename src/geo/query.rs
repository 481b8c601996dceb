//! Geocoding query extraction from OCR text
//!
//! Signs and captions rarely contain a clean address, so several heuristics
//! are combined: explicit coordinates, street names, `Place, CC` pairs, named
//! institutions, and capitalised words or word pairs.

use crate::coord::extract_coordinates_from_text;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const MIN_QUERY_LEN: usize = 3;

static STREET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\s+(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd)\b")
        .expect("valid street regex")
});

static PLACE_AND_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*,\s*[A-Z]{2,}\b").expect("valid region regex")
});

static INSTITUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:University of|Museum of|Cathedral of|Church of|Bridge|Tower|Palace|Castle|Hotel)\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b",
    )
    .expect("valid institution regex")
});

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

/// Candidate geocoding queries found in `text`, in order of discovery
///
/// Duplicates and queries shorter than three characters are dropped.
pub fn extract_location_queries(text: &str) -> Vec<String> {
    let mut candidates: Vec<String> = extract_coordinates_from_text(text)
        .into_iter()
        .map(|c| format!("{},{}", c.lat, c.lng))
        .collect();

    for pattern in [&*STREET, &*PLACE_AND_REGION, &*INSTITUTION] {
        candidates.extend(pattern.find_iter(text).map(|m| m.as_str().to_string()));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        if starts_uppercase(word) && word.chars().count() > 3 {
            candidates.push(word.to_string());
            if let Some(next) = words.get(i + 1).filter(|w| starts_uppercase(w)) {
                candidates.push(format!("{} {}", word, next));
            }
        }
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| c.chars().count() >= MIN_QUERY_LEN)
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

/// Queries from several text blocks, deduplicated across blocks and capped
pub fn queries_for_texts(texts: &[String], max_queries: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    texts
        .iter()
        .flat_map(|t| extract_location_queries(t))
        .filter(|q| seen.insert(q.clone()))
        .take(max_queries)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_street_names() {
        let queries = extract_location_queries("Welcome to Abbey Road");
        assert!(queries.contains(&"Abbey Road".to_string()));
    }

    #[test]
    fn test_place_and_country_code() {
        let queries = extract_location_queries("Greetings from Springfield, IL");
        assert!(queries.contains(&"Springfield, IL".to_string()));
    }

    #[test]
    fn test_institutions() {
        let queries = extract_location_queries("the University of Oxford library");
        assert!(queries.contains(&"University of Oxford".to_string()));
    }

    #[test]
    fn test_coordinates_come_first() {
        let queries = extract_location_queries("Summit 45.8326, 6.8652 Mont Blanc");
        assert_eq!(queries[0], "45.8326,6.8652");
        assert!(queries.contains(&"Mont Blanc".to_string()));
    }

    #[test]
    fn test_capitalised_words_and_pairs() {
        let queries = extract_location_queries("Gare du Nord via Bus");
        assert!(queries.contains(&"Gare".to_string()));
        assert!(queries.contains(&"Nord".to_string()));
        // "du" is lowercase so no pair is formed with it
        assert!(!queries.contains(&"Gare du".to_string()));
        assert!(!queries.contains(&"Bus".to_string()));
    }

    #[test]
    fn test_deduplicated_and_order_preserving() {
        let queries = extract_location_queries("Paris Paris Paris");
        assert_eq!(queries, vec!["Paris", "Paris Paris"]);
    }

    #[test]
    fn test_short_and_lowercase_text_yields_nothing() {
        assert!(extract_location_queries("no caps at all here").is_empty());
        assert!(extract_location_queries("OK").is_empty());
    }

    #[test]
    fn test_queries_for_texts_caps_and_dedups() {
        let texts = vec![
            "London Bridge".to_string(),
            "London Zoo".to_string(),
            "Berlin Munich Hamburg Cologne".to_string(),
        ];
        let all = queries_for_texts(&texts, 100);
        assert_eq!(all.iter().filter(|q| *q == "London").count(), 1);

        let capped = queries_for_texts(&texts, 3);
        assert_eq!(capped.len(), 3);
        assert_eq!(capped, all[..3].to_vec());
    }
}
