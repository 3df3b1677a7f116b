use super::describe::describe;
use super::EvolutionNode;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    pub species_id: String,
    pub species_name: String,
}

/// One root-to-leaf walk: `conditions[i]` describes `stages[i] -> stages[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagePath {
    pub stages: Vec<Stage>,
    pub conditions: Vec<String>,
}

impl StagePath {
    pub fn edge_count(&self) -> usize {
        self.conditions.len()
    }
}

pub fn enumerate(root: &EvolutionNode) -> Vec<StagePath> {
    let mut paths = Vec::new();
    walk(root, vec![stage(root)], Vec::new(), &mut paths);
    paths
}

fn walk(
    node: &EvolutionNode,
    stages: Vec<Stage>,
    conditions: Vec<String>,
    out: &mut Vec<StagePath>,
) {
    if node.evolves_to.is_empty() {
        out.push(StagePath { stages, conditions });
        return;
    }
    for child in &node.evolves_to {
        let mut child_stages = stages.clone();
        child_stages.push(stage(child));
        let mut child_conditions = conditions.clone();
        child_conditions.push(describe(&child.details));
        walk(child, child_stages, child_conditions, out);
    }
}

fn stage(node: &EvolutionNode) -> Stage {
    Stage {
        species_id: node.species_id.clone(),
        species_name: node.species_name.clone(),
    }
}
