use serde::{Deserialize, Serialize};

use crate::api::{id_from_url, PokemonFormResponse, PokemonResponse, PokemonSpeciesResponse};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PokemonRecord {
    pub id: u32,
    pub name: String,
    pub species_name: String,
    pub species_id: Option<String>,
    pub types: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub id: u32,
    pub name: String,
    /// Pokemon slugs of every variety, default first as listed upstream.
    pub varieties: Vec<String>,
    pub evolution_chain_url: Option<String>,
    pub evolves_from: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    pub name: String,
    pub version_group: Option<String>,
}

impl From<PokemonResponse> for PokemonRecord {
    fn from(response: PokemonResponse) -> Self {
        let mut slots = response.types;
        slots.sort_by_key(|slot| slot.slot);
        let species_name = response
            .species
            .as_ref()
            .map(|species| species.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| response.name.clone());
        Self {
            id: response.id,
            species_id: response
                .species
                .as_ref()
                .and_then(|species| id_from_url(&species.url)),
            name: response.name,
            species_name,
            types: slots
                .into_iter()
                .filter_map(|slot| slot.type_info.map(|info| info.name))
                .collect(),
        }
    }
}

impl From<PokemonSpeciesResponse> for SpeciesRecord {
    fn from(response: PokemonSpeciesResponse) -> Self {
        Self {
            id: response.id,
            name: response.name,
            varieties: response
                .varieties
                .into_iter()
                .filter_map(|variety| variety.pokemon.map(|pokemon| pokemon.name))
                .filter(|name| !name.is_empty())
                .collect(),
            evolution_chain_url: response
                .evolution_chain
                .map(|chain| chain.url)
                .filter(|url| !url.is_empty()),
            evolves_from: response.evolves_from_species.map(|species| species.name),
        }
    }
}

impl From<PokemonFormResponse> for FormRecord {
    fn from(response: PokemonFormResponse) -> Self {
        Self {
            name: response.name,
            version_group: response.version_group.map(|group| group.name),
        }
    }
}
