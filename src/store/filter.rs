//! Field predicates understood by every store backend.

use serde_json::Value;

use super::document::Document;

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Field equals the value, or is an array containing it.
    Eq(Value),
    /// Field equals any of the values, or is an array containing one of them.
    In(Vec<Value>),
    /// Field is a string containing the needle, ignoring case.
    ContainsInsensitive(String),
}

impl Condition {
    #[must_use]
    pub fn matches(&self, field: Option<&Value>) -> bool {
        let Some(field) = field else {
            return false;
        };
        match self {
            Self::Eq(expected) => value_matches(field, expected),
            Self::In(candidates) => candidates
                .iter()
                .any(|candidate| value_matches(field, candidate)),
            Self::ContainsInsensitive(needle) => field
                .as_str()
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
        }
    }
}

fn value_matches(field: &Value, expected: &Value) -> bool {
    match field {
        Value::Array(items) if !expected.is_array() => items.contains(expected),
        other => other == expected,
    }
}

/// A conjunction of field conditions. The empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Condition)>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.into(), Condition::Eq(value.into())));
        self
    }

    #[must_use]
    pub fn one_of<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push((field.into(), Condition::In(values)));
        self
    }

    #[must_use]
    pub fn contains_ignore_case(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.conditions
            .push((field.into(), Condition::ContainsInsensitive(needle.into())));
        self
    }

    #[must_use]
    pub fn conditions(&self) -> &[(String, Condition)] {
        &self.conditions
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    #[must_use]
    pub fn matches(&self, record: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, condition)| condition.matches(record.get(field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn guide() -> Document {
        let Value::Object(map) = json!({
            "name": "Rui",
            "location": "Ponta Delgada, Azores",
            "expertise": ["hiking", "whales"],
            "rating": 4.5,
        }) else {
            return Document::new();
        };
        map
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&guide()));
        assert!(Filter::new().is_empty());
    }

    #[test]
    fn eq_matches_scalars_and_array_members() {
        assert!(Filter::new().eq("name", "Rui").matches(&guide()));
        assert!(!Filter::new().eq("name", "rui").matches(&guide()));
        assert!(Filter::new().eq("expertise", "whales").matches(&guide()));
        assert!(
            Filter::new()
                .eq("expertise", json!(["hiking", "whales"]))
                .matches(&guide())
        );
    }

    #[test]
    fn one_of_matches_any_candidate() {
        assert!(
            Filter::new()
                .one_of("expertise", ["boats", "hiking"])
                .matches(&guide())
        );
        assert!(!Filter::new().one_of("expertise", ["boats"]).matches(&guide()));
        assert!(!Filter::new().one_of("expertise", Vec::<String>::new()).matches(&guide()));
    }

    #[test]
    fn contains_ignore_case_matches_substrings() {
        assert!(
            Filter::new()
                .contains_ignore_case("location", "AZORES")
                .matches(&guide())
        );
        assert!(
            !Filter::new()
                .contains_ignore_case("location", "madeira")
                .matches(&guide())
        );
        assert!(
            !Filter::new()
                .contains_ignore_case("rating", "4")
                .matches(&guide())
        );
    }

    #[test]
    fn missing_fields_never_match() {
        assert!(!Filter::new().eq("bio", "anything").matches(&guide()));
    }

    #[test]
    fn conditions_are_conjunctive() {
        let filter = Filter::new()
            .eq("name", "Rui")
            .one_of("expertise", ["boats"]);
        assert!(!filter.matches(&guide()));
        assert_eq!(filter.conditions().len(), 2);
    }
}
