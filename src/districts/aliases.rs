use anyhow::{Context, Result, bail};
use std::collections::{BTreeMap, BTreeSet};

/// Built-in Kerala table: lowercase variant → canonical district name.
static KERALA: &[(&str, &str)] = &[
    ("trivandrum", "Thiruvananthapuram"),
    ("thiruvananthapuram", "Thiruvananthapuram"),
    ("tvm", "Thiruvananthapuram"),
    ("ernakulam", "Ernakulam"),
    ("ekm", "Ernakulam"),
    ("kochi", "Ernakulam"),
    ("cochin", "Ernakulam"),
    ("thrissur", "Thrissur"),
    ("trichur", "Thrissur"),
    ("kozhikode", "Kozhikode"),
    ("calicut", "Kozhikode"),
    ("kollam", "Kollam"),
    ("quilon", "Kollam"),
    ("alappuzha", "Alappuzha"),
    ("alleppey", "Alappuzha"),
    ("palakkad", "Palakkad"),
    ("palghat", "Palakkad"),
    ("malappuram", "Malappuram"),
    ("kannur", "Kannur"),
    ("cannanore", "Kannur"),
    ("kasaragod", "Kasaragod"),
    ("kasargod", "Kasaragod"),
    ("kottayam", "Kottayam"),
    ("idukki", "Idukki"),
    ("wayanad", "Wayanad"),
    ("pathanamthitta", "Pathanamthitta"),
];

/// Immutable variant → canonical mapping handed to the normalizer.
///
/// Keys are stored trimmed and lowercased. A JSON file is a plain object:
/// ```json
/// {
///   "trivandrum": "Thiruvananthapuram",
///   "calicut": "Kozhikode"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistrictAliases {
    entries: BTreeMap<String, String>,
}

impl DistrictAliases {
    pub fn kerala() -> Self {
        Self::from_pairs(KERALA.iter().copied())
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(variant, canonical)| (fold(variant), collapse(canonical)))
            .collect();
        Self { entries }
    }

    /// Loads a table from a JSON object file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read district aliases '{path}'"))?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("'{path}' is not a JSON object of strings"))?;
        let table = Self::from_pairs(raw.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let entries = resolve_chains(&table.entries).with_context(|| format!("invalid aliases in '{path}'"))?;
        Ok(Self { entries })
    }

    /// Returns a copy with `other`'s entries layered on top. Chains such as
    /// `a → B` plus `b → C` are followed so every variant maps straight to a
    /// label that maps to itself.
    pub fn merged_with(&self, other: &DistrictAliases) -> Result<Self> {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(Self {
            entries: resolve_chains(&entries)?,
        })
    }

    pub fn get(&self, raw: &str) -> Option<&str> {
        self.entries.get(&fold(raw)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all `(variant, canonical)` pairs in variant order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Follows each variant's target through the table until it reaches a
/// label that is not itself an alias for something else.
fn resolve_chains(entries: &BTreeMap<String, String>) -> Result<BTreeMap<String, String>> {
    let mut resolved = BTreeMap::new();
    for (variant, canonical) in entries {
        let mut current = canonical;
        let mut seen = BTreeSet::from([variant.clone()]);
        loop {
            let key = fold(current);
            match entries.get(&key) {
                Some(next) if next != current => {
                    if !seen.insert(key) {
                        bail!("district aliases form a cycle through '{variant}'");
                    }
                    current = next;
                }
                _ => break,
            }
        }
        resolved.insert(variant.clone(), current.clone());
    }
    Ok(resolved)
}

fn collapse(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_lookup_is_case_and_space_insensitive() {
        let aliases = DistrictAliases::kerala();
        assert_eq!(aliases.get("  TRIVANDRUM "), Some("Thiruvananthapuram"));
        assert_eq!(aliases.get("Calicut"), Some("Kozhikode"));
        assert_eq!(aliases.get("Atlantis"), None);
    }

    #[test]
    fn test_merge_overrides_builtin_entries() {
        let extra = DistrictAliases::from_pairs([("kochi", "Kochi City"), ("mahe", "Mahe")]);
        let merged = DistrictAliases::kerala().merged_with(&extra).unwrap();

        assert_eq!(merged.get("kochi"), Some("Kochi City"));
        assert_eq!(merged.get("mahe"), Some("Mahe"));
        assert_eq!(merged.get("ekm"), Some("Ernakulam"));
    }

    #[test]
    fn test_merge_follows_chains() {
        let extra = DistrictAliases::from_pairs([("old quarter", "Kochi"), ("mahe", "Pondy")]);
        let merged = DistrictAliases::kerala().merged_with(&extra).unwrap();

        // "Kochi" is itself an alias, so the overlay lands on its target.
        assert_eq!(merged.get("old quarter"), Some("Ernakulam"));
        assert_eq!(merged.get("mahe"), Some("Pondy"));
        for (_, canonical) in merged.iter() {
            assert!(merged.get(canonical).is_none_or(|c| c == canonical), "{canonical}");
        }
    }

    #[test]
    fn test_merge_rejects_cycles() {
        let extra = DistrictAliases::from_pairs([("north", "South"), ("south", "North")]);
        assert!(DistrictAliases::kerala().merged_with(&extra).is_err());
    }

    #[test]
    fn test_load_from_json_file() {
        let path = format!("{}/elab_analytics_aliases_test.json", env::temp_dir().display());
        fs::write(&path, r#"{"Bombay": "Mumbai", "mumbai": "Mumbai"}"#).unwrap();

        let aliases = DistrictAliases::load(&path).unwrap();
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases.get("bombay"), Some("Mumbai"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_non_object() {
        let path = format!("{}/elab_analytics_aliases_bad.json", env::temp_dir().display());
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(DistrictAliases::load(&path).is_err());

        fs::remove_file(&path).unwrap();
    }
}
