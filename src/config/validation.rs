//! Unknown-key detection with "did you mean" suggestions
//!
//! The raw TOML is parsed into a `toml::Value` first and its dotted key paths
//! compared against the known set. Unknown keys become warnings; they never
//! stop a config from loading. Range checks live in `CbmConfig::validate`.

use std::collections::HashSet;

/// Maximum edit distance for a suggestion
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// A non-fatal config warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        if let Some(s) = &self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

/// Every valid dotted key path of `CbmConfig`. Keep in step with app_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    [
        "input",
        "input.delimiter",
        "normalizer",
        "normalizer.motor_state_gating",
        "normalizer.motor_on_code",
        "normalizer.min_amplitude",
        "chart",
        "chart.max_points",
        "chart.width",
        "chart.height",
        "chart.default_axis",
        "chart.default_signal",
        "report",
        "report.title",
        "report.recent_rows",
        "server",
        "server.addr",
        "server.max_upload_bytes",
    ]
    .into_iter()
    .collect()
}

/// All dotted key paths in a TOML tree, tables included.
///
/// `{ a = { b = 1 } }` yields `["a", "a.b"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let Some(table) = value.as_table() else {
        return Vec::new();
    };
    let mut keys = Vec::new();
    for (k, v) in table {
        let path = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        if v.is_table() {
            let nested = walk_toml_keys(v, &path);
            keys.push(path);
            keys.extend(nested);
        } else {
            keys.push(path);
        }
    }
    keys
}

/// Levenshtein edit distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let above = row[j + 1];
            let substitution = diagonal + usize::from(ca != cb);
            row[j + 1] = substitution.min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }
    row[b_chars.len()]
}

/// Closest known key within the suggestion distance. Ties resolve alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (edit_distance(unknown, k), *k))
        .filter(|(d, _)| *d <= MAX_SUGGESTION_DISTANCE)
        .min()
        .map(|(_, k)| k.to_string())
}

/// Warnings for every unknown key in a raw TOML document.
///
/// Text that does not parse yields no warnings; serde reports it afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };
    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("chart", "chart"), 0);
        assert_eq!(edit_distance("max_pionts", "max_points"), 2);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
    }

    #[test]
    fn test_walk_nested_keys() {
        let value: toml::Value = "[chart]\nwidth = 10\n".parse().unwrap();
        let keys = walk_toml_keys(&value, "");
        assert_eq!(keys, vec!["chart".to_string(), "chart.width".to_string()]);
    }

    #[test]
    fn test_typo_suggests_known_key() {
        let warnings = validate_unknown_keys("[report]\nrecent_row = 5\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "report.recent_row");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("report.recent_rows"));
        assert!(warnings[0].to_string().contains("did you mean 'report.recent_rows'"));
    }

    #[test]
    fn test_valid_keys_no_warnings() {
        let warnings = validate_unknown_keys(
            "[input]\ndelimiter = \";\"\n[server]\naddr = \"0.0.0.0:9000\"\n",
        );
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_garbage_key_has_no_suggestion() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_section", &known).is_none());
    }

    #[test]
    fn test_unparseable_text_is_silent() {
        assert!(validate_unknown_keys("[[[").is_empty());
    }
}
