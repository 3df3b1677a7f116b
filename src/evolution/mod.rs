//! Evolution chain resolution and display-row construction.

pub mod chart;
pub mod describe;
pub mod overrides;
pub mod paths;
pub mod rows;
pub mod variants;

use serde::{Deserialize, Serialize};

use crate::api::{id_from_url, ChainLink, EvolutionDetailResponse, NamedResource};
use crate::error::EvolutionError;

pub use chart::{EvolutionChart, NO_EVOLUTION_DATA};
pub use describe::describe;
pub use overrides::OverrideTable;
pub use paths::{enumerate, Stage, StagePath};
pub use rows::{build, DisplayRow, SplitBranch};
pub use variants::{detect_regional_tag, RegionalTag, RegionalVariantMap, VariantDetector};

/// One species position in an evolution tree.
#[derive(Clone, Debug, PartialEq)]
pub struct EvolutionNode {
    pub species_id: String,
    pub species_name: String,
    /// How this node is reached from its parent; empty for the root.
    pub details: Vec<EvolutionDetail>,
    pub evolves_to: Vec<EvolutionNode>,
}

impl EvolutionNode {
    pub fn new(species_id: impl Into<String>, species_name: impl Into<String>) -> Self {
        Self {
            species_id: species_id.into(),
            species_name: species_name.into(),
            details: Vec::new(),
            evolves_to: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<EvolutionDetail>) -> Self {
        self.details = details;
        self
    }

    pub fn evolves_to(mut self, children: Vec<EvolutionNode>) -> Self {
        self.evolves_to = children;
        self
    }

    /// Builds the tree from an upstream chain link.
    ///
    /// A root without a usable species is an error. Children without one are
    /// dropped along with their subtree, so sibling paths still render.
    pub fn from_link(link: &ChainLink) -> Result<Self, EvolutionError> {
        let (species_id, species_name) = species_key(link.species.as_ref())?;
        let evolves_to = link
            .evolves_to
            .iter()
            .filter_map(|child| match Self::from_link(child) {
                Ok(node) => Some(node),
                Err(err) => {
                    tracing::warn!(parent = %species_name, error = %err, "dropping evolution branch");
                    None
                }
            })
            .collect();
        Ok(Self {
            species_id,
            species_name,
            details: link
                .evolution_details
                .iter()
                .filter_map(EvolutionDetail::from_response)
                .collect(),
            evolves_to,
        })
    }

    pub fn leaf_count(&self) -> usize {
        if self.evolves_to.is_empty() {
            1
        } else {
            self.evolves_to.iter().map(EvolutionNode::leaf_count).sum()
        }
    }

    /// Every node in the tree, pre-order.
    pub fn nodes(&self) -> Vec<&EvolutionNode> {
        let mut out = vec![self];
        for child in &self.evolves_to {
            out.extend(child.nodes());
        }
        out
    }
}

fn species_key(species: Option<&NamedResource>) -> Result<(String, String), EvolutionError> {
    let species = species
        .ok_or_else(|| EvolutionError::MalformedRecord("chain link without species".to_string()))?;
    let id = id_from_url(&species.url)
        .ok_or_else(|| EvolutionError::MalformedRecord(format!("bad species url {:?}", species.url)))?;
    if species.name.is_empty() {
        return Err(EvolutionError::MalformedRecord(format!("species {id} has no name")));
    }
    Ok((id, species.name.clone()))
}

/// One transition trigger with only the qualifiers that trigger consults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "kebab-case")]
pub enum EvolutionDetail {
    LevelUp(LevelUp),
    UseItem { item: Option<String> },
    Trade {
        held_item: Option<String>,
        trade_species: Option<String>,
    },
    Shed,
    Spin,
    TowerOfDarkness,
    TowerOfWaters,
    ThreeCriticalHits,
    TakeDamage,
    AgileStyleMove,
    StrongStyleMove,
    RecoilDamage,
    /// Trigger names this crate does not describe.
    Other { name: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub min_level: Option<u32>,
    pub time_of_day: Option<String>,
    pub min_happiness: Option<u32>,
    pub min_affection: Option<u32>,
    pub min_beauty: Option<u32>,
    pub known_move: Option<String>,
    pub known_move_type: Option<String>,
    pub location: Option<String>,
    pub gender: Option<Gender>,
    pub relative_physical_stats: Option<RelativeStats>,
    pub party_species: Option<String>,
    pub party_type: Option<String>,
    pub turn_upside_down: bool,
    pub needs_overworld_rain: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelativeStats {
    AttackHigher,
    DefenseHigher,
    Equal,
}

impl EvolutionDetail {
    pub fn level(min_level: u32) -> Self {
        Self::LevelUp(LevelUp {
            min_level: Some(min_level),
            ..LevelUp::default()
        })
    }

    pub fn use_item(item: &str) -> Self {
        Self::UseItem {
            item: Some(item.to_string()),
        }
    }

    /// `None` when the record carries no trigger at all.
    pub fn from_response(response: &EvolutionDetailResponse) -> Option<Self> {
        let trigger = response.trigger.as_ref()?.name.as_str();
        let detail = match trigger {
            "level-up" => Self::LevelUp(LevelUp {
                min_level: response.min_level.filter(|level| *level > 0),
                time_of_day: response
                    .time_of_day
                    .clone()
                    .filter(|time| !time.is_empty()),
                min_happiness: response.min_happiness.filter(|value| *value > 0),
                min_affection: response.min_affection.filter(|value| *value > 0),
                min_beauty: response.min_beauty.filter(|value| *value > 0),
                known_move: resource_name(&response.known_move),
                known_move_type: resource_name(&response.known_move_type),
                location: resource_name(&response.location),
                gender: match response.gender {
                    Some(1) => Some(Gender::Female),
                    Some(2) => Some(Gender::Male),
                    _ => None,
                },
                relative_physical_stats: match response.relative_physical_stats {
                    Some(1) => Some(RelativeStats::AttackHigher),
                    Some(-1) => Some(RelativeStats::DefenseHigher),
                    Some(0) => Some(RelativeStats::Equal),
                    _ => None,
                },
                party_species: resource_name(&response.party_species),
                party_type: resource_name(&response.party_type),
                turn_upside_down: response.turn_upside_down,
                needs_overworld_rain: response.needs_overworld_rain,
            }),
            "use-item" => Self::UseItem {
                item: resource_name(&response.item),
            },
            "trade" => Self::Trade {
                held_item: resource_name(&response.held_item),
                trade_species: resource_name(&response.trade_species),
            },
            "shed" => Self::Shed,
            "spin" => Self::Spin,
            "tower-of-darkness" => Self::TowerOfDarkness,
            "tower-of-waters" => Self::TowerOfWaters,
            "three-critical-hits" => Self::ThreeCriticalHits,
            "take-damage" => Self::TakeDamage,
            "agile-style-move" => Self::AgileStyleMove,
            "strong-style-move" => Self::StrongStyleMove,
            "recoil-damage" => Self::RecoilDamage,
            other => Self::Other {
                name: other.to_string(),
            },
        };
        Some(detail)
    }
}

fn resource_name(resource: &Option<NamedResource>) -> Option<String> {
    resource
        .as_ref()
        .map(|resource| resource.name.clone())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(json: &str) -> ChainLink {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn from_link_reads_species_ids_and_triggers() {
        let chain = link(
            r#"{
                "species": {"name": "charmander", "url": "https://pokeapi.co/api/v2/pokemon-species/4/"},
                "evolves_to": [{
                    "species": {"name": "charmeleon", "url": "https://pokeapi.co/api/v2/pokemon-species/5/"},
                    "evolution_details": [{
                        "trigger": {"name": "level-up", "url": ""},
                        "min_level": 16,
                        "gender": null,
                        "time_of_day": "",
                        "relative_physical_stats": null
                    }],
                    "evolves_to": []
                }]
            }"#,
        );
        let root = EvolutionNode::from_link(&chain).unwrap();
        assert_eq!(root.species_id, "4");
        assert_eq!(root.evolves_to[0].species_name, "charmeleon");
        assert_eq!(root.evolves_to[0].details, vec![EvolutionDetail::level(16)]);
    }

    #[test]
    fn malformed_children_are_dropped_but_siblings_survive() {
        let chain = link(
            r#"{
                "species": {"name": "eevee", "url": "/pokemon-species/133/"},
                "evolves_to": [
                    {"species": null, "evolves_to": []},
                    {"species": {"name": "vaporeon", "url": "/pokemon-species/134/"}}
                ]
            }"#,
        );
        let root = EvolutionNode::from_link(&chain).unwrap();
        assert_eq!(root.evolves_to.len(), 1);
        assert_eq!(root.evolves_to[0].species_name, "vaporeon");
    }

    #[test]
    fn root_without_species_is_malformed() {
        let err = EvolutionNode::from_link(&link("{}")).unwrap_err();
        assert!(matches!(err, EvolutionError::MalformedRecord(_)));
    }

    #[test]
    fn details_without_trigger_are_skipped() {
        let response: EvolutionDetailResponse = serde_json::from_str(r#"{"min_level": 5}"#).unwrap();
        assert!(EvolutionDetail::from_response(&response).is_none());

        let response: EvolutionDetailResponse =
            serde_json::from_str(r#"{"trigger": {"name": "other", "url": ""}}"#).unwrap();
        assert_eq!(
            EvolutionDetail::from_response(&response),
            Some(EvolutionDetail::Other {
                name: "other".to_string()
            })
        );
    }

    #[test]
    fn leaf_count_counts_branches() {
        let tree = EvolutionNode::new("133", "eevee").evolves_to(vec![
            EvolutionNode::new("134", "vaporeon"),
            EvolutionNode::new("135", "jolteon"),
            EvolutionNode::new("136", "flareon"),
        ]);
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.nodes().len(), 4);
    }
}
