//! Count extraction from structured API payloads.

use std::collections::HashSet;

use cpstats_core::{ApiExtraction, Rating, RatingSpec};
use serde_json::Value;

use crate::error::ScraperError;

/// Read a count out of `payload` as described by `extraction`.
///
/// # Errors
///
/// Returns [`ScraperError::MalformedPayload`] when a pointer does not resolve
/// or resolves to the wrong JSON type. Callers treat that the same as a
/// transport failure and move on to the page tier.
pub fn extract_api_count(
    payload: &Value,
    extraction: &ApiExtraction,
    url: &str,
) -> Result<u64, ScraperError> {
    let malformed = |reason: String| ScraperError::MalformedPayload {
        url: url.to_string(),
        reason,
    };

    match extraction {
        ApiExtraction::Field { pointer } => {
            let field = payload
                .pointer(pointer)
                .ok_or_else(|| malformed(format!("missing field {pointer}")))?;
            as_count(field).ok_or_else(|| malformed(format!("field {pointer} is not a count")))
        }
        ApiExtraction::DistinctAccepted {
            items,
            verdict,
            accepted,
            key,
        } => {
            let submissions = resolve(payload, items)
                .and_then(Value::as_array)
                .ok_or_else(|| malformed(format!("no submission array at '{items}'")))?;

            let solved: HashSet<String> = submissions
                .iter()
                .filter(|item| item.pointer(verdict) == Some(accepted))
                .filter_map(|item| problem_key(item, key))
                .collect();

            Ok(solved.len() as u64)
        }
    }
}

/// Largest cursor value among `batch` items; items without one are ignored.
#[must_use]
pub fn max_cursor(batch: &[Value], pointer: &str) -> Option<u64> {
    batch
        .iter()
        .filter_map(|item| item.pointer(pointer).and_then(Value::as_u64))
        .max()
}

/// Read a rating out of `payload`. `None` when none of the fields resolve,
/// which is how an unrated account or an error document looks.
#[must_use]
pub fn extract_rating(payload: &Value, spec: &RatingSpec) -> Option<Rating> {
    let int = |pointer: &str| payload.pointer(pointer).and_then(Value::as_i64);
    let text = |pointer: &str| {
        payload
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let rating = Rating {
        current: int(&spec.current),
        max: int(&spec.max),
        rank: text(&spec.rank),
        max_rank: text(&spec.max_rank),
    };
    (!rating.is_empty()).then_some(rating)
}

/// `Value::pointer` with the empty string meaning the document root.
fn resolve<'a>(payload: &'a Value, pointer: &str) -> Option<&'a Value> {
    if pointer.is_empty() {
        Some(payload)
    } else {
        payload.pointer(pointer)
    }
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Join the key pointers into one identifier; items missing any part are skipped.
fn problem_key(item: &Value, key: &[String]) -> Option<String> {
    let parts = key
        .iter()
        .map(|pointer| {
            item.pointer(pointer).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("_"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const URL: &str = "https://api.example.test";

    fn codeforces_extraction() -> ApiExtraction {
        ApiExtraction::DistinctAccepted {
            items: "/result".to_string(),
            verdict: "/verdict".to_string(),
            accepted: json!("OK"),
            key: vec!["/problem/contestId".to_string(), "/problem/index".to_string()],
        }
    }

    #[test]
    fn field_reads_nested_number() {
        let payload = json!({"data": {"matchedUser": {"submitStats": {"acSubmissionNum": [{"count": 312}, {"count": 90}]}}}});
        let extraction = ApiExtraction::Field {
            pointer: "/data/matchedUser/submitStats/acSubmissionNum/0/count".to_string(),
        };
        assert_eq!(extract_api_count(&payload, &extraction, URL).unwrap(), 312);
    }

    #[test]
    fn field_accepts_numeric_string() {
        let payload = json!({"solved": " 77 "});
        let extraction = ApiExtraction::Field {
            pointer: "/solved".to_string(),
        };
        assert_eq!(extract_api_count(&payload, &extraction, URL).unwrap(), 77);
    }

    #[test]
    fn field_missing_is_malformed() {
        let payload = json!({"data": {"matchedUser": null}});
        let extraction = ApiExtraction::Field {
            pointer: "/data/matchedUser/submitStats/acSubmissionNum/0/count".to_string(),
        };
        let err = extract_api_count(&payload, &extraction, URL).unwrap_err();
        assert!(matches!(err, ScraperError::MalformedPayload { .. }));
    }

    #[test]
    fn distinct_accepted_dedupes_repeat_solves() {
        let payload = json!({
            "status": "OK",
            "result": [
                {"verdict": "OK", "problem": {"contestId": 1, "index": "A"}},
                {"verdict": "OK", "problem": {"contestId": 1, "index": "A"}},
                {"verdict": "WRONG_ANSWER", "problem": {"contestId": 1, "index": "B"}},
                {"verdict": "OK", "problem": {"contestId": 2, "index": "A"}},
                {"verdict": "OK", "problem": {"index": "Z"}}
            ]
        });
        assert_eq!(
            extract_api_count(&payload, &codeforces_extraction(), URL).unwrap(),
            2
        );
    }

    #[test]
    fn distinct_accepted_failed_status_is_malformed() {
        let payload = json!({"status": "FAILED", "comment": "handle not found"});
        assert!(extract_api_count(&payload, &codeforces_extraction(), URL).is_err());
    }

    #[test]
    fn distinct_accepted_over_root_array() {
        let payload = json!([
            {"result": "AC", "problem_id": "abc100_a"},
            {"result": "WA", "problem_id": "abc100_b"},
            {"result": "AC", "problem_id": "abc100_a"},
            {"result": "AC", "problem_id": "abc101_c"}
        ]);
        let extraction = ApiExtraction::DistinctAccepted {
            items: String::new(),
            verdict: "/result".to_string(),
            accepted: json!("AC"),
            key: vec!["/problem_id".to_string()],
        };
        assert_eq!(extract_api_count(&payload, &extraction, URL).unwrap(), 2);
    }

    #[test]
    fn max_cursor_skips_items_without_one() {
        let batch = [
            json!({"epoch_second": 100}),
            json!({"epoch_second": 250}),
            json!({"id": 3}),
        ];
        assert_eq!(max_cursor(&batch, "/epoch_second"), Some(250));
        assert_eq!(max_cursor(&[], "/epoch_second"), None);
    }

    fn codeforces_rating() -> RatingSpec {
        RatingSpec {
            url_template: "https://api.example.test/user.info?handles={username}".to_string(),
            current: "/result/0/rating".to_string(),
            max: "/result/0/maxRating".to_string(),
            rank: "/result/0/rank".to_string(),
            max_rank: "/result/0/maxRank".to_string(),
        }
    }

    #[test]
    fn rating_reads_all_four_fields() {
        let payload = json!({"status": "OK", "result": [{
            "handle": "tourist", "rating": 3500, "maxRating": 4009,
            "rank": "legendary grandmaster", "maxRank": "tourist"
        }]});
        assert_eq!(
            extract_rating(&payload, &codeforces_rating()),
            Some(Rating {
                current: Some(3500),
                max: Some(4009),
                rank: Some("legendary grandmaster".to_string()),
                max_rank: Some("tourist".to_string()),
            })
        );
    }

    #[test]
    fn unrated_account_has_no_rating() {
        let payload = json!({"status": "OK", "result": [{"handle": "newbie"}]});
        assert_eq!(extract_rating(&payload, &codeforces_rating()), None);

        let failed = json!({"status": "FAILED", "comment": "handles: not found"});
        assert_eq!(extract_rating(&failed, &codeforces_rating()), None);
    }

    #[test]
    fn distinct_accepted_over_positional_rows() {
        // uHunt rows: [submission id, problem id, verdict, ...]; 90 is accepted.
        let payload = json!({"name": "x", "subs": [[1, 36, 90], [2, 36, 90], [3, 37, 70], [4, 38, 90]]});
        let extraction = ApiExtraction::DistinctAccepted {
            items: "/subs".to_string(),
            verdict: "/2".to_string(),
            accepted: json!(90),
            key: vec!["/1".to_string()],
        };
        assert_eq!(extract_api_count(&payload, &extraction, URL).unwrap(), 2);
    }
}
