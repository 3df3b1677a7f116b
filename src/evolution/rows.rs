use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::describe::{merge_conditions, select_for_tag, strip_parens};
use super::overrides::OverrideTable;
use super::paths::StagePath;
use super::variants::{detect_regional_tag, RegionalTag, RegionalVariantMap};

/// A shared prefix folds into a split row only with exactly this many
/// distinct terminals.
pub const SPLIT_BRANCH_COUNT: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitBranch {
    pub identifier: String,
    pub condition: String,
}

/// What the presentation layer draws, one entry per visual row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayRow {
    Linear {
        identifiers: Vec<String>,
        conditions: Vec<String>,
    },
    Split {
        prefix_identifiers: Vec<String>,
        prefix_conditions: Vec<String>,
        branches: [SplitBranch; SPLIT_BRANCH_COUNT],
    },
}

impl DisplayRow {
    pub fn linear(identifiers: Vec<String>, conditions: Vec<String>) -> Self {
        DisplayRow::Linear {
            identifiers,
            conditions,
        }
    }

    /// Every identifier the row shows, prefix first.
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            DisplayRow::Linear { identifiers, .. } => {
                identifiers.iter().map(String::as_str).collect()
            }
            DisplayRow::Split {
                prefix_identifiers,
                branches,
                ..
            } => prefix_identifiers
                .iter()
                .map(String::as_str)
                .chain(branches.iter().map(|branch| branch.identifier.as_str()))
                .collect(),
        }
    }

    /// The linear rows this row stands for. A split expands to one row per branch.
    pub fn expand(&self) -> Vec<DisplayRow> {
        match self {
            DisplayRow::Linear { .. } => vec![self.clone()],
            DisplayRow::Split {
                prefix_identifiers,
                prefix_conditions,
                branches,
            } => branches
                .iter()
                .map(|branch| {
                    let mut identifiers = prefix_identifiers.clone();
                    identifiers.push(branch.identifier.clone());
                    let mut conditions = prefix_conditions.clone();
                    conditions.push(branch.condition.clone());
                    DisplayRow::linear(identifiers, conditions)
                })
                .collect(),
        }
    }
}

/// A row before dedup and split merging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateRow {
    /// `None` for the default-form row.
    pub tag: Option<RegionalTag>,
    pub identifiers: Vec<String>,
    pub conditions: Vec<String>,
}

impl CandidateRow {
    /// Applies the per-tag alternative selection to every condition.
    pub fn new(tag: Option<RegionalTag>, identifiers: Vec<String>, conditions: Vec<String>) -> Self {
        let conditions = conditions
            .iter()
            .map(|condition| select_for_tag(condition, tag))
            .collect();
        Self {
            tag,
            identifiers,
            conditions,
        }
    }

    /// A single pokemon with no edges, e.g. a costume variety.
    pub fn standalone(identifier: impl Into<String>) -> Self {
        Self {
            tag: None,
            identifiers: vec![identifier.into()],
            conditions: Vec::new(),
        }
    }

    fn signature(&self) -> (Option<RegionalTag>, Vec<String>) {
        (self.tag, self.identifiers.clone())
    }
}

/// Species slug -> species id over every stage of every path.
///
/// Redirected regional rows name their target by slug; when the target is
/// part of the chain it is shown by id like every other stage.
pub fn species_index(paths: &[StagePath]) -> HashMap<String, String> {
    paths
        .iter()
        .flat_map(|path| path.stages.iter())
        .map(|stage| (stage.species_name.clone(), stage.species_id.clone()))
        .collect()
}

/// The default-form row and one row per regional tag present on `path`.
///
/// `variants` is keyed by species id; stages without an entry have no
/// regional forms.
pub fn candidate_rows(
    path: &StagePath,
    species_ids: &HashMap<String, String>,
    variants: &HashMap<String, RegionalVariantMap>,
    overrides: &OverrideTable,
) -> Vec<CandidateRow> {
    let stage_variants: Vec<RegionalVariantMap> = path
        .stages
        .iter()
        .map(|stage| variants.get(&stage.species_id).cloned().unwrap_or_default())
        .collect();
    let base_identifiers = base_identifiers(path, overrides);

    let mut rows = Vec::new();
    if let Some(row) = base_row(path, &base_identifiers, overrides) {
        rows.push(row);
    }
    let tags: BTreeSet<RegionalTag> = stage_variants
        .iter()
        .flat_map(|map| map.keys().copied())
        .collect();
    for tag in tags {
        if let Some(row) = regional_row(
            path,
            &base_identifiers,
            &stage_variants,
            tag,
            species_ids,
            overrides,
        ) {
            rows.push(row);
        }
    }
    rows
}

fn base_identifiers(path: &StagePath, overrides: &OverrideTable) -> Vec<String> {
    path.stages
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            index
                .checked_sub(1)
                .and_then(|edge| path.conditions.get(edge))
                .and_then(|condition| time_of_day_form(overrides, &stage.species_name, condition))
                .unwrap_or(&stage.species_id)
                .to_string()
        })
        .collect()
}

/// The form a time-of-day species takes when its incoming condition names
/// exactly one time of day.
fn time_of_day_form<'a>(
    overrides: &'a OverrideTable,
    species: &str,
    condition: &str,
) -> Option<&'a String> {
    let forms = overrides.time_of_day_forms_for(species)?;
    let condition = condition.to_ascii_lowercase();
    let mut matches = forms
        .iter()
        .filter(|(time, _)| condition.contains(&format!(" at {time}")));
    let (_, form) = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(form)
}

fn base_row(
    path: &StagePath,
    base_identifiers: &[String],
    overrides: &OverrideTable,
) -> Option<CandidateRow> {
    let mut conditions = path.conditions.clone();
    for (edge, pair) in path.stages.windows(2).enumerate() {
        if let Some(transform) =
            overrides.method_override(&pair[0].species_name, None, &pair[1].species_name)
        {
            conditions[edge] = transform.apply(&conditions[edge]);
        }
    }

    let form_only_edge = path
        .stages
        .windows(2)
        .position(|pair| overrides.is_form_only(&pair[0].species_name, &pair[1].species_name));
    match form_only_edge {
        None => Some(CandidateRow::new(None, base_identifiers.to_vec(), conditions)),
        Some(0) => None,
        Some(edge) => Some(CandidateRow::new(
            None,
            base_identifiers[..=edge].to_vec(),
            conditions[..edge].to_vec(),
        )),
    }
}

fn regional_row(
    path: &StagePath,
    base_identifiers: &[String],
    stage_variants: &[RegionalVariantMap],
    tag: RegionalTag,
    species_ids: &HashMap<String, String>,
    overrides: &OverrideTable,
) -> Option<CandidateRow> {
    let stages = &path.stages;
    let first = stage_variants.iter().position(|map| map.contains_key(&tag))?;

    let mut identifiers = base_identifiers.to_vec();
    for (index, map) in stage_variants.iter().enumerate().skip(first) {
        if let Some(variant) = map.get(&tag) {
            identifiers[index] = variant.clone();
        }
    }

    let mut conditions = path.conditions.clone();
    let mut redirected_at = None;
    for index in first..stages.len() {
        let Some(entry) = overrides.regional_evolution(&stages[index].species_name, tag) else {
            continue;
        };
        if index < conditions.len() {
            conditions[index] = entry.condition.clone();
        } else {
            conditions.push(entry.condition.clone());
        }
        let next = stages.get(index + 1).map(|stage| stage.species_name.as_str());
        if next != Some(entry.next.as_str()) {
            identifiers.truncate(index + 1);
            identifiers.push(
                species_ids
                    .get(&entry.next)
                    .cloned()
                    .unwrap_or_else(|| entry.next.clone()),
            );
            conditions.truncate(index + 1);
            redirected_at = Some(index);
            break;
        }
    }

    let limit = redirected_at.unwrap_or(usize::MAX).min(conditions.len());
    for (edge, pair) in stages.windows(2).enumerate().take(limit) {
        if let Some(transform) =
            overrides.method_override(&pair[0].species_name, Some(tag), &pair[1].species_name)
        {
            conditions[edge] = transform.apply(&conditions[edge]);
        }
    }

    Some(CandidateRow::new(Some(tag), identifiers, conditions))
}

/// Candidate rows deduplicated by `(tag, identifiers)`, in first-seen order.
#[derive(Debug, Default)]
pub struct RowSet {
    rows: Vec<CandidateRow>,
    index: HashMap<(Option<RegionalTag>, Vec<String>), usize>,
}

impl RowSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `row`, or merges its conditions into an earlier row with the
    /// same signature.
    pub fn push(&mut self, row: CandidateRow) {
        let signature = row.signature();
        if let Some(&position) = self.index.get(&signature) {
            let existing = &mut self.rows[position];
            let len = existing.conditions.len().max(row.conditions.len());
            let merged: Vec<String> = (0..len)
                .map(|edge| {
                    merge_conditions(
                        existing.conditions.get(edge).map_or("", String::as_str),
                        row.conditions.get(edge).map_or("", String::as_str),
                    )
                })
                .collect();
            existing.conditions = merged;
            return;
        }
        self.index.insert(signature, self.rows.len());
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[CandidateRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Folds two-way branches into split rows. Splits come first, followed
    /// by every row that did not take part in one.
    pub fn finish(self) -> Vec<DisplayRow> {
        merge_splits(self.rows)
    }
}

struct SplitGroup {
    prefix_identifiers: Vec<String>,
    prefix_conditions: Vec<String>,
    members: Vec<usize>,
    terminals: Vec<SplitBranch>,
}

fn merge_splits(rows: Vec<CandidateRow>) -> Vec<DisplayRow> {
    let mut groups: Vec<SplitGroup> = Vec::new();
    let mut by_prefix: HashMap<(Vec<String>, Vec<String>), usize> = HashMap::new();

    for (position, row) in rows.iter().enumerate() {
        let Some(last) = row.identifiers.len().checked_sub(1) else {
            continue;
        };
        if last == 0 || row.conditions.len() != last {
            continue;
        }
        let key = (
            row.identifiers[..last].to_vec(),
            row.conditions[..last - 1].to_vec(),
        );
        let group_index = *by_prefix.entry(key.clone()).or_insert_with(|| {
            groups.push(SplitGroup {
                prefix_identifiers: key.0,
                prefix_conditions: key.1,
                members: Vec::new(),
                terminals: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[group_index];
        group.members.push(position);

        let branch = SplitBranch {
            identifier: row.identifiers[last].clone(),
            condition: row.conditions[last - 1].clone(),
        };
        match group
            .terminals
            .iter_mut()
            .find(|terminal| terminal.identifier == branch.identifier)
        {
            Some(terminal) => *terminal = branch,
            None => group.terminals.push(branch),
        }
    }

    let mut merged = vec![false; rows.len()];
    let mut out = Vec::new();
    for group in groups {
        if group.terminals.len() != SPLIT_BRANCH_COUNT {
            continue;
        }
        let mut terminals = group.terminals;
        terminals.sort_by(|a, b| {
            let a_regional = detect_regional_tag(&a.identifier).is_some();
            let b_regional = detect_regional_tag(&b.identifier).is_some();
            a_regional
                .cmp(&b_regional)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        let Ok(branches) = <[SplitBranch; SPLIT_BRANCH_COUNT]>::try_from(terminals) else {
            continue;
        };
        for member in group.members {
            merged[member] = true;
        }
        out.push(DisplayRow::Split {
            prefix_identifiers: group.prefix_identifiers,
            prefix_conditions: group.prefix_conditions,
            branches,
        });
    }

    out.extend(
        rows.into_iter()
            .zip(merged)
            .filter(|(_, merged)| !merged)
            .map(|(row, _)| DisplayRow::linear(row.identifiers, row.conditions)),
    );
    out
}

/// Pure row construction for already-enumerated paths.
pub fn build(
    paths: &[StagePath],
    variants: &HashMap<String, RegionalVariantMap>,
    overrides: &OverrideTable,
) -> Vec<DisplayRow> {
    let species_ids = species_index(paths);
    let mut rows = RowSet::new();
    for path in paths {
        for row in candidate_rows(path, &species_ids, variants, overrides) {
            rows.push(row);
        }
    }
    rows.finish()
}

/// Item edges of a regional row that enter the row's form from another one.
pub fn place_edges(row: &CandidateRow) -> Vec<usize> {
    let Some(tag) = row.tag else {
        return Vec::new();
    };
    row.identifiers
        .windows(2)
        .enumerate()
        .filter(|(edge, pair)| {
            detect_regional_tag(&pair[1]) == Some(tag)
                && detect_regional_tag(&pair[0]) != Some(tag)
                && row
                    .conditions
                    .get(*edge)
                    .is_some_and(|condition| mentions_item_use(condition))
        })
        .map(|(edge, _)| edge)
        .collect()
}

fn mentions_item_use(condition: &str) -> bool {
    let words: Vec<&str> = strip_parens(condition).split_whitespace().collect();
    words
        .windows(2)
        .any(|pair| pair[0].eq_ignore_ascii_case("use"))
}

/// `(Use Thunder Stone)` + `Alola` -> `(Use Thunder Stone, in Alola)`.
pub fn append_place(condition: &str, place: &str) -> String {
    let marker = format!("in {place}");
    if condition.contains(&marker) {
        return condition.to_string();
    }
    let inner = strip_parens(condition).trim();
    if inner.is_empty() {
        format!("({marker})")
    } else {
        format!("({inner}, {marker})")
    }
}
