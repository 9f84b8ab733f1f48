use std::collections::BTreeSet;

use infra_forge_dsl::Declaration;

use super::EmitError;
use crate::semantic::SemanticModel;

/// The resources each declaration depends on, directly or through
/// variables, indexed by declaration.
pub(super) fn resource_dependencies(model: &SemanticModel) -> Vec<BTreeSet<usize>> {
    let declarations = &model.program().declarations;
    (0..declarations.len())
        .map(|index| {
            let mut found = BTreeSet::new();
            let mut visited = BTreeSet::from([index]);
            let mut pending: Vec<usize> = model.references(index).to_vec();
            while let Some(target) = pending.pop() {
                match declarations.get(target) {
                    Some(Declaration::Resource(_)) if target != index => {
                        found.insert(target);
                    }
                    Some(Declaration::Variable(_)) if visited.insert(target) => {
                        pending.extend_from_slice(model.references(target));
                    }
                    _ => {}
                }
            }
            found
        })
        .collect()
}

/// Orders resource declarations so each follows everything it depends on.
///
/// Kahn's algorithm; among resources that are ready at the same time the
/// one declared first goes first, so the order is deterministic.
pub(super) fn order_resources(
    model: &SemanticModel,
    dependencies: &[BTreeSet<usize>],
) -> Result<Vec<usize>, EmitError> {
    let resources: Vec<usize> = model
        .program()
        .declarations
        .iter()
        .enumerate()
        .filter(|(_, d)| matches!(d, Declaration::Resource(_)))
        .map(|(i, _)| i)
        .collect();

    let mut remaining: Vec<usize> = dependencies.iter().map(BTreeSet::len).collect();
    let mut ready: BTreeSet<usize> = resources
        .iter()
        .copied()
        .filter(|r| remaining[*r] == 0)
        .collect();
    let mut ordered = Vec::with_capacity(resources.len());

    while let Some(next) = ready.pop_first() {
        ordered.push(next);
        for &dependent in &resources {
            if dependencies[dependent].contains(&next) {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if ordered.len() < resources.len() {
        let names = resources
            .iter()
            .filter(|r| !ordered.contains(r))
            .filter_map(|r| model.program().declarations[*r].name())
            .map(|id| id.name.clone())
            .collect();
        return Err(EmitError::DependencyCycle { names });
    }
    Ok(ordered)
}
