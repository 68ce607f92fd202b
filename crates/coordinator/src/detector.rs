//! Waits-for cycle detection and victim selection.

use repcrec_core::{Timestamp, TxId};
use std::collections::{BTreeMap, BTreeSet};

/// Find any cycle in the directed graph described by `edges`
/// (`waiter -> holder`), returning the transactions on it. Returns `None`
/// if the graph is acyclic.
pub fn find_cycle(edges: &[(TxId, TxId)]) -> Option<Vec<TxId>> {
    let mut adjacency: BTreeMap<TxId, Vec<TxId>> = BTreeMap::new();
    let mut nodes: BTreeSet<TxId> = BTreeSet::new();
    for (waiter, holder) in edges {
        nodes.insert(waiter.clone());
        nodes.insert(holder.clone());
        adjacency.entry(waiter.clone()).or_default().push(holder.clone());
    }

    let mut visited: BTreeSet<TxId> = BTreeSet::new();
    let mut stack: Vec<TxId> = Vec::new();
    for start in &nodes {
        if visited.contains(start) {
            continue;
        }
        if let Some(cycle) = dfs(start, &adjacency, &mut visited, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

fn dfs(
    node: &TxId,
    adjacency: &BTreeMap<TxId, Vec<TxId>>,
    visited: &mut BTreeSet<TxId>,
    stack: &mut Vec<TxId>,
) -> Option<Vec<TxId>> {
    if let Some(pos) = stack.iter().position(|n| n == node) {
        return Some(stack[pos..].to_vec());
    }
    if visited.contains(node) {
        return None;
    }
    stack.push(node.clone());
    if let Some(neighbors) = adjacency.get(node) {
        for next in neighbors {
            if let Some(cycle) = dfs(next, adjacency, visited, stack) {
                return Some(cycle);
            }
        }
    }
    stack.pop();
    visited.insert(node.clone());
    None
}

/// Pick the victim among a cycle's transactions: the youngest by
/// `begin_ts`, ties broken by the lexicographically smallest id.
pub fn select_victim(cycle: &[TxId], begin_ts: impl Fn(&TxId) -> Timestamp) -> TxId {
    let mut candidates: Vec<&TxId> = cycle.iter().collect();
    candidates.sort_by(|a, b| begin_ts(b).cmp(&begin_ts(a)).then_with(|| a.cmp(b)));
    candidates[0].clone()
}
