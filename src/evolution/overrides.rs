use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::describe::{join_alternatives, split_alternatives};
use super::variants::RegionalTag;
use crate::error::OverrideError;

const BUILTIN_TABLE: &str = include_str!("../../assets/evolution_overrides.ron");

/// Hand-curated corrections applied on top of upstream evolution chains.
///
/// Pure data: adding an entry never needs a code change.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideTable {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub regional_evolutions: Vec<RegionalEvolution>,
    #[serde(default)]
    pub method_overrides: Vec<MethodOverride>,
    #[serde(default)]
    pub time_of_day_forms: Vec<TimeOfDayForms>,
    #[serde(default)]
    pub cosmetic_forms: Vec<CosmeticForms>,
}

/// `species` in region `tag` evolves into `next` under `condition`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalEvolution {
    pub species: String,
    pub tag: RegionalTag,
    pub next: String,
    pub condition: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodOverride {
    pub species: String,
    pub form: FormKey,
    pub next: String,
    pub transform: ConditionTransform,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKey {
    Base,
    Regional(RegionalTag),
}

impl FormKey {
    pub fn of(tag: Option<RegionalTag>) -> Self {
        tag.map_or(FormKey::Base, FormKey::Regional)
    }
}

/// Closed set of rewrites a method override may apply to inherited text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionTransform {
    /// Replace the condition outright.
    Literal(String),
    /// Swap one word or phrase for another, e.g. a color or stone name.
    Substitute { from: String, to: String },
    /// Keep only the alternative mentioning `containing`; untouched if none does.
    KeepAlternative { containing: String },
}

impl ConditionTransform {
    pub fn apply(&self, inherited: &str) -> String {
        match self {
            ConditionTransform::Literal(text) => text.clone(),
            ConditionTransform::Substitute { from, to } => inherited.replace(from.as_str(), to),
            ConditionTransform::KeepAlternative { containing } => {
                let needle = containing.to_ascii_lowercase();
                split_alternatives(inherited)
                    .into_iter()
                    .find(|part| part.to_ascii_lowercase().contains(&needle))
                    .map(|part| join_alternatives(&[part]))
                    .unwrap_or_else(|| inherited.to_string())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDayForms {
    pub species: String,
    /// Time of day (`day`, `night`, `dusk`) -> pokemon form slug.
    pub forms: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticForms {
    pub species: String,
    /// Slug suffix identifying the costume varieties, e.g. `-cap`.
    pub suffix: String,
}

impl OverrideTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, OverrideError> {
        Self::from_ron_str(BUILTIN_TABLE)
    }

    pub fn from_ron_str(source: &str) -> Result<Self, OverrideError> {
        ron::de::from_str(source).map_err(|err| OverrideError::Parse(err.to_string()))
    }

    pub async fn load(path: &Path) -> Result<Self, OverrideError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| OverrideError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_ron_str(&source)
    }

    pub fn regional_evolution(&self, species: &str, tag: RegionalTag) -> Option<&RegionalEvolution> {
        self.regional_evolutions
            .iter()
            .find(|entry| entry.species == species && entry.tag == tag)
    }

    /// Whether `species -> next` only happens for some regional form, so the
    /// default-form row must stop before it.
    pub fn is_form_only(&self, species: &str, next: &str) -> bool {
        self.regional_evolutions
            .iter()
            .any(|entry| entry.species == species && entry.next == next)
    }

    pub fn method_override(
        &self,
        species: &str,
        tag: Option<RegionalTag>,
        next: &str,
    ) -> Option<&ConditionTransform> {
        let form = FormKey::of(tag);
        self.method_overrides
            .iter()
            .find(|entry| entry.species == species && entry.form == form && entry.next == next)
            .map(|entry| &entry.transform)
    }

    pub fn time_of_day_forms_for(&self, species: &str) -> Option<&BTreeMap<String, String>> {
        self.time_of_day_forms
            .iter()
            .find(|entry| entry.species == species)
            .map(|entry| &entry.forms)
    }

    pub fn cosmetic_suffix(&self, species: &str) -> Option<&str> {
        self.cosmetic_forms
            .iter()
            .find(|entry| entry.species == species)
            .map(|entry| entry.suffix.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_parses() {
        let table = OverrideTable::builtin().unwrap();
        assert_eq!(table.version, 1);
        assert_eq!(table.regional_evolutions.len(), 9);
        assert_eq!(table.method_overrides.len(), 4);
    }

    #[test]
    fn regional_lookups() {
        let table = OverrideTable::builtin().unwrap();
        let yamask = table.regional_evolution("yamask", RegionalTag::Galar).unwrap();
        assert_eq!(yamask.next, "runerigus");
        assert_eq!(yamask.condition, "(Take 49+ damage)");
        assert!(table.regional_evolution("yamask", RegionalTag::Alola).is_none());
        assert!(table.is_form_only("wooper", "clodsire"));
        assert!(!table.is_form_only("wooper", "quagsire"));
    }

    #[test]
    fn method_overrides_are_keyed_by_form() {
        let table = OverrideTable::builtin().unwrap();
        let base = table.method_override("vulpix", None, "ninetales").unwrap();
        let alola = table
            .method_override("vulpix", Some(RegionalTag::Alola), "ninetales")
            .unwrap();
        assert_eq!(base.apply(""), "(Use Fire Stone)");
        assert_eq!(alola.apply(""), "(Use Ice Stone)");
        assert!(table
            .method_override("vulpix", Some(RegionalTag::Galar), "ninetales")
            .is_none());
    }

    #[test]
    fn time_of_day_and_cosmetic_entries() {
        let table = OverrideTable::builtin().unwrap();
        let lycanroc = table.time_of_day_forms_for("lycanroc").unwrap();
        assert_eq!(lycanroc.get("night").map(String::as_str), Some("lycanroc-midnight"));
        assert_eq!(lycanroc.len(), 3);
        assert!(table.time_of_day_forms_for("rockruff").is_none());
        assert_eq!(table.cosmetic_suffix("pikachu"), Some("-cap"));
        assert_eq!(table.cosmetic_suffix("raichu"), None);
    }

    #[test]
    fn transforms() {
        let substitute = ConditionTransform::Substitute {
            from: "Fire Stone".to_string(),
            to: "Ice Stone".to_string(),
        };
        assert_eq!(substitute.apply("(Use Fire Stone)"), "(Use Ice Stone)");

        let keep = ConditionTransform::KeepAlternative {
            containing: "ice stone".to_string(),
        };
        assert_eq!(keep.apply("(Level 22 or Use Ice Stone)"), "(Use Ice Stone)");
        assert_eq!(keep.apply("(Level 22)"), "(Level 22)");
    }

    #[test]
    fn custom_table_from_ron() {
        let table = OverrideTable::from_ron_str(
            r#"(
                method_overrides: [
                    (species: "eevee", form: Regional(Hisui), next: "glaceon",
                     transform: KeepAlternative(containing: "Ice")),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(table.version, 0);
        assert!(table.regional_evolutions.is_empty());
        assert!(table
            .method_override("eevee", Some(RegionalTag::Hisui), "glaceon")
            .is_some());
    }

    #[test]
    fn bad_ron_is_a_parse_error() {
        let err = OverrideTable::from_ron_str("(version: \"one\")").unwrap_err();
        assert!(matches!(err, OverrideError::Parse(_)));
    }

    #[tokio::test]
    async fn load_reads_table_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.ron");
        tokio::fs::write(&path, "(cosmetic_forms: [(species: \"pikachu\", suffix: \"-cap\")])")
            .await
            .unwrap();
        let table = OverrideTable::load(&path).await.unwrap();
        assert_eq!(table.cosmetic_suffix("pikachu"), Some("-cap"));

        let missing = OverrideTable::load(&dir.path().join("absent.ron")).await;
        assert!(matches!(missing, Err(OverrideError::Read { .. })));
    }
}
