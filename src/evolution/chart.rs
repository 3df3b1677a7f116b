use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use super::overrides::OverrideTable;
use super::paths::{enumerate, StagePath};
use super::rows::{append_place, candidate_rows, place_edges, species_index, CandidateRow, DisplayRow, RowSet};
use super::variants::{RegionalTag, RegionalVariantMap, VariantDetector};
use super::EvolutionNode;
use crate::error::EvolutionError;
use crate::resolver::Resolver;

pub const NO_EVOLUTION_DATA: &str = "No evolution data available";

/// Everything the presentation layer needs for one pokemon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "rows", rename_all = "snake_case")]
pub enum EvolutionChart {
    Rows(Vec<DisplayRow>),
    NoData,
}

impl EvolutionChart {
    pub fn rows(&self) -> &[DisplayRow] {
        match self {
            EvolutionChart::Rows(rows) => rows,
            EvolutionChart::NoData => &[],
        }
    }

    /// Distinct identifiers across all rows, in first-seen order.
    pub fn identifiers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows()
            .iter()
            .flat_map(DisplayRow::identifiers)
            .filter(|identifier| seen.insert(identifier.to_string()))
            .map(str::to_string)
            .collect()
    }
}

/// Chart for the chain `identifier` belongs to. Never fails; anything that
/// keeps the chain from loading yields [`EvolutionChart::NoData`].
pub async fn chart_for_pokemon(
    resolver: &Resolver,
    overrides: &OverrideTable,
    identifier: &str,
) -> EvolutionChart {
    match load_chain(resolver, identifier).await {
        Ok(root) => chart_for_chain(resolver, overrides, &root).await,
        Err(err) => {
            warn!(identifier, error = %err, "evolution chain unavailable");
            EvolutionChart::NoData
        }
    }
}

pub async fn load_chain(
    resolver: &Resolver,
    identifier: &str,
) -> Result<EvolutionNode, EvolutionError> {
    let species = resolver.species_for_pokemon(identifier).await?;
    let url = species.evolution_chain_url.as_deref().ok_or_else(|| {
        EvolutionError::MalformedRecord(format!("species {} has no evolution chain", species.name))
    })?;
    let chain = resolver.evolution_chain(url).await?;
    let link = chain.chain.as_ref().ok_or_else(|| {
        EvolutionError::MalformedRecord(format!("evolution chain {} is empty", chain.id))
    })?;
    EvolutionNode::from_link(link)
}

/// Rows for an already-loaded tree. Paths through a species whose record
/// cannot be fetched are dropped, as is any row with a stage that does not
/// resolve to a pokemon; the rest still render.
pub async fn chart_for_chain(
    resolver: &Resolver,
    overrides: &OverrideTable,
    root: &EvolutionNode,
) -> EvolutionChart {
    let nodes = root.nodes();
    let mut species_ids: Vec<String> = Vec::new();
    for node in &nodes {
        if !species_ids.contains(&node.species_id) {
            species_ids.push(node.species_id.clone());
        }
    }
    // Warm the species cache with bounded concurrency; failures are
    // reported per node below.
    resolver.species_many(&species_ids).await;

    let detector = VariantDetector::new(resolver.clone());
    let mut variants: HashMap<String, RegionalVariantMap> = HashMap::new();
    let mut unavailable: HashSet<String> = HashSet::new();
    for node in &nodes {
        match detector.variants_for(node).await {
            Ok(map) => {
                variants.insert(node.species_id.clone(), map);
            }
            Err(err) => {
                warn!(species = %node.species_name, error = %err, "dropping paths through species");
                unavailable.insert(node.species_id.clone());
            }
        }
    }

    let paths: Vec<StagePath> = enumerate(root)
        .into_iter()
        .filter(|path| {
            path.stages
                .iter()
                .all(|stage| !unavailable.contains(&stage.species_id))
        })
        .collect();
    let names = species_index(&paths);

    let mut candidates: Vec<CandidateRow> = Vec::new();
    let mut cosmetic_seen: HashSet<String> = HashSet::new();
    for path in &paths {
        for identifier in cosmetic_forms(resolver, overrides, path).await {
            if cosmetic_seen.insert(identifier.clone()) {
                candidates.push(CandidateRow::standalone(identifier));
            }
        }
        candidates.extend(candidate_rows(path, &names, &variants, overrides));
    }

    let unresolved = unresolved_stages(resolver, &candidates).await;
    let mut rows = RowSet::new();
    for mut candidate in candidates {
        if let Some(identifier) = candidate
            .identifiers
            .iter()
            .find(|identifier| unresolved.contains(*identifier))
        {
            warn!(identifier = %identifier, row = ?candidate.identifiers, "dropping row with unresolvable stage");
            continue;
        }
        annotate_places(resolver, &mut candidate).await;
        rows.push(candidate);
    }

    let rows = rows.finish();
    debug!(species = %root.species_name, rows = rows.len(), "built evolution chart");
    if rows.is_empty() {
        EvolutionChart::NoData
    } else {
        EvolutionChart::Rows(rows)
    }
}

/// Identifiers across `candidates` whose pokemon record cannot be fetched.
async fn unresolved_stages(resolver: &Resolver, candidates: &[CandidateRow]) -> HashSet<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let identifiers: Vec<String> = candidates
        .iter()
        .flat_map(|candidate| candidate.identifiers.iter())
        .filter(|identifier| seen.insert(identifier.as_str()))
        .cloned()
        .collect();
    resolver
        .resolve_many(&identifiers)
        .await
        .into_iter()
        .filter_map(|(identifier, result)| match result {
            Ok(_) => None,
            Err(err) => {
                debug!(identifier = %identifier, error = %err, "stage does not resolve");
                Some(identifier)
            }
        })
        .collect()
}

/// Costume varieties of any stage on `path`, sorted.
async fn cosmetic_forms(
    resolver: &Resolver,
    overrides: &OverrideTable,
    path: &StagePath,
) -> Vec<String> {
    let mut forms = Vec::new();
    for stage in &path.stages {
        let Some(suffix) = overrides.cosmetic_suffix(&stage.species_name) else {
            continue;
        };
        let species = match resolver.species(&stage.species_id).await {
            Ok(species) => species,
            Err(err) => {
                debug!(species = %stage.species_name, error = %err, "no costume varieties");
                continue;
            }
        };
        let prefix = format!("{}-", stage.species_name);
        forms.extend(
            species
                .varieties
                .iter()
                .filter(|variety| variety.starts_with(&prefix) && variety.ends_with(suffix))
                .cloned(),
        );
    }
    forms.sort();
    forms
}

async fn annotate_places(resolver: &Resolver, row: &mut CandidateRow) {
    let Some(tag) = row.tag else {
        return;
    };
    for edge in place_edges(row) {
        let place = region_place(resolver, &row.identifiers[edge + 1], tag).await;
        row.conditions[edge] = append_place(&row.conditions[edge], place);
    }
}

/// Region a regional form belongs to, from its form record's version group.
pub async fn region_place(resolver: &Resolver, identifier: &str, tag: RegionalTag) -> &'static str {
    match resolver.form(identifier).await {
        Ok(form) => form
            .version_group
            .as_deref()
            .and_then(place_for_version_group)
            .unwrap_or_else(|| tag.place()),
        Err(err) => {
            debug!(identifier, error = %err, "form lookup failed, using region name");
            tag.place()
        }
    }
}

pub fn place_for_version_group(version_group: &str) -> Option<&'static str> {
    match version_group.to_ascii_lowercase().as_str() {
        "sun-moon" | "ultra-sun-ultra-moon" => Some("Alola"),
        "sword-shield" => Some("Galar"),
        "legends-arceus" => Some("Hisui"),
        "scarlet-violet" => Some("Paldea"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Upstream;
    use crate::config::Config;
    use crate::testing::FakeUpstream;
    use std::sync::Arc;

    fn resolver(upstream: FakeUpstream) -> Resolver {
        Resolver::new(
            Arc::new(upstream) as Arc<dyn Upstream>,
            Config::default().with_api_base("http://fake"),
        )
    }

    #[test]
    fn version_groups_map_to_places() {
        assert_eq!(place_for_version_group("sun-moon"), Some("Alola"));
        assert_eq!(place_for_version_group("ultra-sun-ultra-moon"), Some("Alola"));
        assert_eq!(place_for_version_group("sword-shield"), Some("Galar"));
        assert_eq!(place_for_version_group("legends-arceus"), Some("Hisui"));
        assert_eq!(place_for_version_group("scarlet-violet"), Some("Paldea"));
        assert_eq!(place_for_version_group("red-blue"), None);
    }

    #[tokio::test]
    async fn place_falls_back_to_region_name() {
        let resolver = resolver(FakeUpstream::new().with_json(
            "http://fake/pokemon-form/raichu-alola",
            r#"{"name":"raichu-alola","version_group":{"name":"sun-moon","url":""}}"#,
        ));
        assert_eq!(region_place(&resolver, "raichu-alola", RegionalTag::Alola).await, "Alola");
        assert_eq!(region_place(&resolver, "meowth-galar", RegionalTag::Galar).await, "Galar");
    }

    #[tokio::test]
    async fn unknown_pokemon_has_no_data() {
        let resolver = resolver(FakeUpstream::new());
        let chart = chart_for_pokemon(&resolver, &OverrideTable::default(), "missingno").await;
        assert_eq!(chart, EvolutionChart::NoData);
        assert!(chart.rows().is_empty());
    }

    #[tokio::test]
    async fn lone_species_is_a_single_stage_row() {
        let resolver = resolver(
            FakeUpstream::new()
                .with_json(
                    "http://fake/pokemon-species/128",
                    r#"{"id":128,"name":"tauros","varieties":[
                        {"is_default":true,"pokemon":{"name":"tauros","url":""}}
                    ]}"#,
                )
                .with_json("http://fake/pokemon/128", r#"{"id":128,"name":"tauros"}"#),
        );
        let root = EvolutionNode::new("128", "tauros");
        let chart = chart_for_chain(&resolver, &OverrideTable::default(), &root).await;
        assert_eq!(
            chart,
            EvolutionChart::Rows(vec![DisplayRow::linear(vec!["128".to_string()], Vec::new())])
        );
    }

    #[tokio::test]
    async fn only_stage_failing_to_resolve_leaves_no_data() {
        let resolver = resolver(FakeUpstream::new().with_json(
            "http://fake/pokemon-species/132",
            r#"{"id":132,"name":"ditto","varieties":[
                {"is_default":true,"pokemon":{"name":"ditto","url":""}}
            ]}"#,
        ));
        let root = EvolutionNode::new("132", "ditto");
        let chart = chart_for_chain(&resolver, &OverrideTable::default(), &root).await;
        assert_eq!(chart, EvolutionChart::NoData);
    }

    #[test]
    fn no_data_serializes_with_status_only() {
        let json = serde_json::to_string(&EvolutionChart::NoData).unwrap();
        assert_eq!(json, r#"{"status":"no_data"}"#);
    }
}
