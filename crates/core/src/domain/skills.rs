use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Canonical ordered skill list.
///
/// Inbound payloads carry skills as a JSON array, a comma-delimited string, or a
/// bracketed JSON-ish string (`["rust","sql"]`, `{"rust","sql"}`). All shapes are
/// folded into one trimmed, de-duplicated list at the boundary so nothing
/// downstream inspects the raw shape. Quote stripping only applies to the
/// string shapes; array elements are kept verbatim apart from trimming.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Skills(Vec<String>);

impl Skills {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut skills: Vec<String> = Vec::new();
        for value in values {
            let skill = value.as_ref().trim();
            if skill.is_empty() || skills.iter().any(|existing| existing == skill) {
                continue;
            }
            skills.push(skill.to_string());
        }
        Self(skills)
    }

    /// Parses user-supplied text. A well-formed JSON array is decoded as such so
    /// quoted elements may contain commas; anything else is split on commas.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(values) = serde_json::from_str::<Vec<String>>(trimmed) {
            return Self::from_values(values);
        }
        let inner = strip_enclosing(trimmed, '[', ']')
            .or_else(|| strip_enclosing(trimmed, '{', '}'))
            .unwrap_or(trimmed);
        Self::from_values(inner.split(',').map(unquote))
    }

    /// Decodes the persisted column written by [`Skills::to_json`].
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Vec<String>>(raw).map(Self::from_values)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

impl fmt::Display for Skills {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSkills {
    List(Vec<String>),
    Text(String),
}

impl<'de> Deserialize<'de> for Skills {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawSkills>::deserialize(deserializer)?;
        Ok(match raw {
            Some(RawSkills::List(values)) => Self::from_values(values),
            Some(RawSkills::Text(text)) => Self::parse(&text),
            None => Self::default(),
        })
    }
}

fn strip_enclosing(value: &str, open: char, close: char) -> Option<&str> {
    value.strip_prefix(open).and_then(|rest| rest.strip_suffix(close))
}

fn unquote(token: &str) -> &str {
    token.trim().trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::Skills;

    #[test]
    fn comma_string_is_split_and_trimmed() {
        let skills = Skills::parse(" rust, sql ,, kafka ");
        assert_eq!(skills.as_slice(), ["rust", "sql", "kafka"]);
    }

    #[test]
    fn bracketed_json_ish_strings_are_unwrapped() {
        assert_eq!(Skills::parse(r#"["rust", "sql"]"#).as_slice(), ["rust", "sql"]);
        assert_eq!(Skills::parse(r#"{"rust","sql"}"#).as_slice(), ["rust", "sql"]);
        assert_eq!(Skills::parse("['go']").as_slice(), ["go"]);
    }

    #[test]
    fn duplicates_are_dropped_preserving_first_seen_order() {
        let skills = Skills::from_values(["sql", "rust", "sql", " rust "]);
        assert_eq!(skills.as_slice(), ["sql", "rust"]);
    }

    #[test]
    fn deserializes_every_inbound_shape_to_the_same_value() {
        let from_array: Skills = serde_json::from_str(r#"["rust","sql"]"#).expect("array");
        let from_text: Skills = serde_json::from_str(r#""rust, sql""#).expect("text");
        let from_json_text: Skills =
            serde_json::from_str(r#""[\"rust\",\"sql\"]""#).expect("json text");
        let from_null: Skills = serde_json::from_str("null").expect("null");

        assert_eq!(from_array, from_text);
        assert_eq!(from_array, from_json_text);
        assert!(from_null.is_empty());
    }

    #[test]
    fn array_elements_keep_quotes_and_commas() {
        let skills: Skills =
            serde_json::from_str(r#"["C, C++", "\"quoted\" go", "'rust'"]"#).expect("array");
        assert_eq!(skills.as_slice(), ["C, C++", "\"quoted\" go", "'rust'"]);

        let text: Skills = serde_json::from_str(r#""[\"C, C++\", \"sql\"]""#).expect("json text");
        assert_eq!(text.as_slice(), ["C, C++", "sql"]);
    }

    #[test]
    fn stored_column_round_trips_unchanged() {
        let skills = Skills::from_values(["C, C++", "say \"hi\"", "{braces}"]);
        let restored = Skills::from_json(&skills.to_json()).expect("stored json");
        assert_eq!(restored, skills);
        assert!(Skills::from_json("rust, sql").is_err());
    }

    #[test]
    fn serializes_as_plain_array() {
        let skills = Skills::parse("rust,sql");
        assert_eq!(skills.to_json(), r#"["rust","sql"]"#);
    }
}
