use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::EvolutionNode;
use crate::error::EvolutionError;
use crate::resolver::Resolver;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegionalTag {
    Alola,
    Galar,
    Hisui,
    Paldea,
}

impl RegionalTag {
    pub const ALL: [RegionalTag; 4] = [
        RegionalTag::Alola,
        RegionalTag::Galar,
        RegionalTag::Hisui,
        RegionalTag::Paldea,
    ];

    pub fn token(self) -> &'static str {
        match self {
            RegionalTag::Alola => "alola",
            RegionalTag::Galar => "galar",
            RegionalTag::Hisui => "hisui",
            RegionalTag::Paldea => "paldea",
        }
    }

    pub fn adjective(self) -> &'static str {
        match self {
            RegionalTag::Alola => "Alolan",
            RegionalTag::Galar => "Galarian",
            RegionalTag::Hisui => "Hisuian",
            RegionalTag::Paldea => "Paldean",
        }
    }

    pub fn place(self) -> &'static str {
        match self {
            RegionalTag::Alola => "Alola",
            RegionalTag::Galar => "Galar",
            RegionalTag::Hisui => "Hisui",
            RegionalTag::Paldea => "Paldea",
        }
    }
}

/// Regional tag -> variety slug for one species.
pub type RegionalVariantMap = BTreeMap<RegionalTag, String>;

/// Pikachu cap costumes carry region tokens (`pikachu-alola-cap`) but are
/// not regional forms.
pub fn is_cosmetic_cap(slug: &str) -> bool {
    slug.starts_with("pikachu-") && slug.ends_with("-cap")
}

/// Regional tag appearing as a whole hyphen-delimited segment of `slug`.
pub fn detect_regional_tag(slug: &str) -> Option<RegionalTag> {
    let slug = slug.to_ascii_lowercase();
    if is_cosmetic_cap(&slug) {
        return None;
    }
    RegionalTag::ALL
        .into_iter()
        .find(|tag| slug.split('-').any(|segment| segment == tag.token()))
}

pub fn classify_varieties(varieties: &[String]) -> RegionalVariantMap {
    let mut map = RegionalVariantMap::new();
    for variety in varieties {
        if let Some(tag) = detect_regional_tag(variety) {
            map.insert(tag, variety.clone());
        }
    }
    map
}

/// Per-species regional variant lookup backed by the resolver's species cache.
pub struct VariantDetector {
    resolver: Resolver,
    maps: Mutex<HashMap<String, RegionalVariantMap>>,
}

impl VariantDetector {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            maps: Mutex::new(HashMap::new()),
        }
    }

    pub async fn variants_for(
        &self,
        node: &EvolutionNode,
    ) -> Result<RegionalVariantMap, EvolutionError> {
        let cached = self
            .maps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&node.species_id)
            .cloned();
        if let Some(map) = cached {
            return Ok(map);
        }

        let species = self.resolver.species(&node.species_id).await?;
        let map = classify_varieties(&species.varieties);
        self.maps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node.species_id.clone(), map.clone());
        Ok(map)
    }
}
