//! Detail sanitization and per-type field filtering.
//!
//! Detail keys are user-controlled and end up as field names in a document
//! store, so operator-looking keys must never reach it. Callers always apply
//! [`sanitize`] before [`filter_by_type`]; [`clean_details`] does both.

use crate::achievement::{AchievementType, Details};

/// Leading character of document-store query operators.
pub const OPERATOR_PREFIX: char = '$';

/// Operator keywords rejected outright.
pub const DENIED_KEYS: &[&str] = &[
  "$where",
  "$expr",
  "$function",
  "$accumulator",
  "$lookup",
  "$graphLookup",
];

/// Return a copy of `raw` without operator-prefixed or denied keys.
pub fn sanitize(raw: &Details) -> Details {
  raw
    .iter()
    .filter(|(k, _)| !k.starts_with(OPERATOR_PREFIX) && !DENIED_KEYS.contains(&k.as_str()))
    .map(|(k, v)| (k.clone(), v.clone()))
    .collect()
}

/// Restrict `details` to the allow-list of `achievement_type`. Unknown types
/// yield an empty map.
pub fn filter_by_type(achievement_type: &AchievementType, details: &Details) -> Details {
  let allowed = achievement_type.allowed_detail_fields();
  details
    .iter()
    .filter(|(k, _)| allowed.contains(&k.as_str()))
    .map(|(k, v)| (k.clone(), v.clone()))
    .collect()
}

/// [`sanitize`] then [`filter_by_type`].
pub fn clean_details(achievement_type: &AchievementType, raw: &Details) -> Details {
  filter_by_type(achievement_type, &sanitize(raw))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn map(v: serde_json::Value) -> Details {
    v.as_object().cloned().unwrap()
  }

  #[test]
  fn sanitize_drops_operator_keys() {
    let raw = map(json!({
      "rank": "1",
      "$where": "sleep(1000)",
      "$set": {"points": 100},
      "$graphLookup": {},
      "organizer": "BEM",
    }));
    let clean = sanitize(&raw);
    assert_eq!(clean.len(), 2);
    assert!(clean.keys().all(|k| !k.starts_with('$')));
    // Input untouched.
    assert_eq!(raw.len(), 5);
  }

  #[test]
  fn sanitize_is_idempotent() {
    let raw = map(json!({"a": 1, "$b": 2, "c$": 3, "$expr": {"$gt": 1}}));
    let once = sanitize(&raw);
    assert_eq!(sanitize(&once), once);
    assert!(once.contains_key("c$"));
  }

  #[test]
  fn filter_keeps_allowed_values_unmodified() {
    let raw = map(json!({
      "rank": 1,
      "location": {"city": "Surabaya"},
      "injected": "x",
    }));
    let filtered = filter_by_type(&AchievementType::Competition, &raw);
    assert_eq!(filtered.len(), 2);
    assert_eq!(filtered["rank"], json!(1));
    assert_eq!(filtered["location"], json!({"city": "Surabaya"}));
  }

  #[test]
  fn filter_unknown_type_is_empty() {
    let raw = map(json!({"rank": 1, "issn": "1234"}));
    let t = AchievementType::parse("Kompetisi");
    assert!(filter_by_type(&t, &raw).is_empty());
  }

  #[test]
  fn filter_is_per_type() {
    let raw = map(json!({"rank": 1, "issn": "1234-5678"}));
    let filtered = filter_by_type(&AchievementType::Publication, &raw);
    assert_eq!(filtered.keys().collect::<Vec<_>>(), vec!["issn"]);
  }
}
