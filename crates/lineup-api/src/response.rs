//! Human-readable lookup responses.
//!
//! The engine returns counts and occurrence lists; this module turns them
//! into the sentences the lookup frontend displays.

use lineup_types::{OccurrenceRecord, ResolutionResult};
use serde::Serialize;

/// JSON body of a `POST /check-dj` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupResponse {
    /// Headline sentence.
    pub message: String,
    /// Suggested entity name, fuzzy matches only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Most recent occurrence in words, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Every occurrence of the resolved entity, newest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performances: Option<Vec<OccurrenceRecord>>,
    /// `exact_match`, `fuzzy_match` or `no_match`.
    pub result: &'static str,
}

impl LookupResponse {
    /// Phrase a resolution result for `venue`.
    pub fn from_result(result: ResolutionResult, venue: &str) -> Self {
        let kind = result.kind();
        match result {
            ResolutionResult::ExactMatch(m) => {
                let n = m.performance_count;
                Self {
                    message: format!(
                        "{} has played at {venue} {n} {}!",
                        m.entity_name,
                        times(n)
                    ),
                    suggestion: None,
                    details: Some(format!(
                        "Last played on {} at {} on {}.",
                        m.most_recent.date, m.most_recent.time, m.most_recent.location
                    )),
                    performances: Some(m.all_occurrences),
                    result: kind,
                }
            }
            ResolutionResult::FuzzyMatch(m) => {
                let n = m.performance_count;
                Self {
                    message: format!(
                        "{} might have played at {venue}. Did you mean {}?",
                        m.queried_name, m.suggested_name
                    ),
                    details: Some(format!(
                        "{} has played {n} {}, last on {} at {} on {}.",
                        m.suggested_name,
                        times(n),
                        m.most_recent.date,
                        m.most_recent.time,
                        m.most_recent.location
                    )),
                    suggestion: Some(m.suggested_name),
                    performances: Some(m.all_occurrences),
                    result: kind,
                }
            }
            ResolutionResult::NoMatch(m) => Self {
                message: format!(
                    "{} has not played at {venue} (according to our records).",
                    m.queried_name
                ),
                suggestion: None,
                details: None,
                performances: None,
                result: kind,
            },
        }
    }
}

/// "time" or "times". Zero is never produced by a match.
const fn times(n: usize) -> &'static str {
    if n > 1 { "times" } else { "time" }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lineup_types::{ExactMatch, FuzzyMatch, MostRecent, NoMatch};

    use super::*;

    fn occurrence(name: &str, date: &str) -> OccurrenceRecord {
        OccurrenceRecord {
            date: date.to_owned(),
            name: name.to_owned(),
            label: String::new(),
            time: String::from("08:00"),
            location: String::from("Berghain"),
            is_closing_set: false,
            year: None,
            date_key: None,
        }
    }

    fn most_recent() -> MostRecent {
        MostRecent {
            date: String::from("2024-01-10"),
            time: String::from("08:00"),
            location: String::from("Berghain"),
        }
    }

    #[test]
    fn exact_single_uses_singular() {
        let result = ResolutionResult::ExactMatch(ExactMatch {
            entity_name: String::from("DVS1"),
            performance_count: 1,
            most_recent: most_recent(),
            all_occurrences: vec![occurrence("DVS1", "2024-01-10")],
        });
        let response = LookupResponse::from_result(result, "Berghain");
        assert_eq!(response.message, "DVS1 has played at Berghain 1 time!");
        assert_eq!(
            response.details.as_deref(),
            Some("Last played on 2024-01-10 at 08:00 on Berghain.")
        );
        assert_eq!(response.suggestion, None);
        assert_eq!(response.performances.unwrap().len(), 1);
        assert_eq!(response.result, "exact_match");
    }

    #[test]
    fn exact_plural() {
        let result = ResolutionResult::ExactMatch(ExactMatch {
            entity_name: String::from("ben klock"),
            performance_count: 2,
            most_recent: most_recent(),
            all_occurrences: vec![
                occurrence("ben klock", "2024-01-10"),
                occurrence("Ben Klock", "2023-05-01"),
            ],
        });
        let response = LookupResponse::from_result(result, "Panorama Bar");
        assert_eq!(response.message, "ben klock has played at Panorama Bar 2 times!");
    }

    #[test]
    fn fuzzy_names_query_and_suggestion() {
        let result = ResolutionResult::FuzzyMatch(FuzzyMatch {
            queried_name: String::from("Ben Klok"),
            suggested_name: String::from("Ben Klock"),
            performance_count: 2,
            most_recent: most_recent(),
            all_occurrences: vec![
                occurrence("Ben Klock", "2024-01-10"),
                occurrence("Ben Klock", "2023-05-01"),
            ],
        });
        let response = LookupResponse::from_result(result, "Berghain");
        assert_eq!(
            response.message,
            "Ben Klok might have played at Berghain. Did you mean Ben Klock?"
        );
        assert_eq!(response.suggestion.as_deref(), Some("Ben Klock"));
        assert_eq!(
            response.details.as_deref(),
            Some("Ben Klock has played 2 times, last on 2024-01-10 at 08:00 on Berghain.")
        );
        assert_eq!(response.result, "fuzzy_match");
    }

    #[test]
    fn no_match_has_message_only() {
        let result = ResolutionResult::NoMatch(NoMatch {
            queried_name: String::from("Zzzxqy Nonexistent"),
        });
        let response = LookupResponse::from_result(result, "Berghain");
        assert_eq!(
            response.message,
            "Zzzxqy Nonexistent has not played at Berghain (according to our records)."
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "Zzzxqy Nonexistent has not played at Berghain (according to our records).",
                "result": "no_match",
            })
        );
    }
}
