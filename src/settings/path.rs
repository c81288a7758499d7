use super::SettingsError;
use std::fmt;
use std::str::FromStr;

/// A validated dotted key into the search options blob.
///
/// `"search_top_k"` addresses a top-level field and
/// `"engine_settings.searxng.base_url"` a nested one. No other shapes exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOptionPath {
    Field(String),
    Nested {
        section: String,
        group: String,
        field: String,
    },
}

impl FromStr for SearchOptionPath {
    type Err = SettingsError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(SettingsError::InvalidKeyFormat(key.to_string()));
        }
        match segments.as_slice() {
            [field] => Ok(Self::Field(field.to_string())),
            [section, group, field] => Ok(Self::Nested {
                section: section.to_string(),
                group: group.to_string(),
                field: field.to_string(),
            }),
            _ => Err(SettingsError::InvalidKeyFormat(key.to_string())),
        }
    }
}

impl fmt::Display for SearchOptionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.write_str(field),
            Self::Nested { section, group, field } => write!(f, "{section}.{group}.{field}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_segment() {
        let path: SearchOptionPath = "primary_engine".parse().unwrap();
        assert_eq!(path, SearchOptionPath::Field("primary_engine".to_string()));
    }

    #[test]
    fn test_parse_three_segments() {
        let path: SearchOptionPath = "engine_settings.searxng.base_url".parse().unwrap();
        assert_eq!(path.to_string(), "engine_settings.searxng.base_url");
        assert!(matches!(path, SearchOptionPath::Nested { ref group, .. } if group == "searxng"));
    }

    #[test]
    fn test_parse_rejects_other_segment_counts() {
        for key in ["", "a.b", "a.b.c.d", "invalid.key.format.too.many.levels", "a..c"] {
            let err = key.parse::<SearchOptionPath>().unwrap_err();
            assert!(matches!(err, SettingsError::InvalidKeyFormat(ref k) if k == key), "{key}");
        }
    }
}
