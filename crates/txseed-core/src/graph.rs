use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Evaluation order for a set of named nodes with dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyOrder {
    /// Node indexes in evaluation order, when acyclic.
    pub order: Option<Vec<usize>>,
    /// Nodes left on a cycle, in declaration order.
    pub cycle: Option<Vec<String>>,
}

/// Order `nodes` so every node comes after the nodes it depends on.
///
/// Each node is `(name, dependencies)`. Dependencies naming something
/// outside `nodes` are ignored; ties are broken by declaration index, so
/// the result is deterministic.
pub fn dependency_order<S: AsRef<str>>(nodes: &[(S, Vec<S>)]) -> DependencyOrder {
    let index: BTreeMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, (name, _))| (name.as_ref(), idx))
        .collect();

    let mut indegree = vec![0_usize; nodes.len()];
    let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];

    for (idx, (_, deps)) in nodes.iter().enumerate() {
        for dep in deps {
            if let Some(&dep_idx) = index.get(dep.as_ref())
                && dependents[dep_idx].insert(idx)
            {
                indegree[idx] += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter_map(|(idx, degree)| (*degree == 0).then_some(idx))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &child in &dependents[next] {
            indegree[child] = indegree[child].saturating_sub(1);
            if indegree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() == nodes.len() {
        DependencyOrder {
            order: Some(order),
            cycle: None,
        }
    } else {
        let cycle = indegree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .map(|(idx, _)| nodes[idx].0.as_ref().to_string())
            .collect();
        DependencyOrder {
            order: None,
            cycle: Some(cycle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_dependencies_first() {
        let nodes = vec![
            ("tax", vec!["amount"]),
            ("amount", vec![]),
            ("label", vec!["tax", "amount"]),
        ];
        let report = dependency_order(&nodes);
        assert_eq!(report.order, Some(vec![1, 0, 2]));
        assert!(report.cycle.is_none());
    }

    #[test]
    fn keeps_declaration_order_for_independent_nodes() {
        let nodes = vec![("c", vec![]), ("a", vec!["external"]), ("b", vec![])];
        assert_eq!(dependency_order(&nodes).order, Some(vec![0, 1, 2]));
    }

    #[test]
    fn reports_cycles() {
        let nodes = vec![("a", vec!["b"]), ("b", vec!["a"]), ("c", vec![])];
        let report = dependency_order(&nodes);
        assert!(report.order.is_none());
        assert_eq!(
            report.cycle,
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }
}
