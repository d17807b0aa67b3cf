//! District-label canonicalization.
//!
//! [`DistrictAliases`] is the static variant table; [`DistrictNormalizer`]
//! applies it. Labels not in the table pass through (trimmed) as their own
//! canonical form.

mod aliases;

pub use aliases::DistrictAliases;

/// Label used when a record carries no district at all.
pub const UNKNOWN_DISTRICT: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct DistrictNormalizer {
    aliases: DistrictAliases,
}

impl DistrictNormalizer {
    pub fn new(aliases: DistrictAliases) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &DistrictAliases {
        &self.aliases
    }

    /// Canonical form of `raw`. Missing or blank labels become
    /// [`UNKNOWN_DISTRICT`].
    pub fn normalize(&self, raw: Option<&str>) -> String {
        let Some(label) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return UNKNOWN_DISTRICT.to_string();
        };

        match self.aliases.get(label) {
            Some(canonical) => canonical.to_string(),
            None => label.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

impl Default for DistrictNormalizer {
    fn default() -> Self {
        Self::new(DistrictAliases::kerala())
    }
}
