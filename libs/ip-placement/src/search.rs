// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Depth-first search for a zone assignment of static IPs.
//!
//! Every state on the stack is a full copy of the placements. A frame
//! branches on the first candidate that still has more than one eligible
//! zone and yields one child per zone, least allocated zone first. Allocation
//! counts are derived from each frame's own copy, so popping a frame is all
//! the rollback a backtrack needs.
//!
//! The first child that is fully resolved and evenly distributed is
//! returned. The search is deterministic for a given input order.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::tracker::AllocationTracker;
use crate::types::NetworkPlacements;

/// Brute-force zone assignment for a set of networks' static IPs.
#[derive(Debug, Clone)]
pub struct BruteForceIpAllocation {
    placements: NetworkPlacements,
}

impl BruteForceIpAllocation {
    pub fn new(placements: NetworkPlacements) -> Self {
        Self { placements }
    }

    /// The first acceptable assignment, or `None` if no assignment of the
    /// candidates is fully resolved and evenly distributed.
    pub fn find_best_combination(&self) -> Option<NetworkPlacements> {
        let Some(root) = SearchFrame::new(self.placements.clone()) else {
            // Nothing to branch on.
            return is_acceptable(&self.placements).then(|| self.placements.clone());
        };

        let mut stack = vec![root];
        let mut explored: usize = 0;

        while let Some(frame) = stack.last_mut() {
            let Some(candidate) = frame.next() else {
                stack.pop();
                continue;
            };
            explored += 1;

            if is_acceptable(&candidate) {
                debug!(explored, depth = stack.len(), "Found static IP placement");
                return Some(candidate);
            }

            if let Some(child) = SearchFrame::new(candidate) {
                stack.push(child);
            }
        }

        debug!(explored, "No static IP placement satisfies even distribution");
        None
    }
}

/// One decision level: a copied state and the zones still to try for its
/// first undecided candidate.
#[derive(Debug)]
struct SearchFrame {
    state: NetworkPlacements,
    network: usize,
    candidate: usize,
    az_order: Vec<String>,
    next_az: usize,
}

impl SearchFrame {
    /// `None` when `state` has no undecided candidate.
    fn new(state: NetworkPlacements) -> Option<Self> {
        let (network, candidate) = state.values().enumerate().find_map(|(n, candidates)| {
            candidates
                .iter()
                .position(|c| c.is_undecided())
                .map(|c| (n, c))
        })?;

        let tracker = AllocationTracker::from_placements(&state);
        let (_, candidates) = state.get_index(network)?;
        let az_order = tracker.sort_by_least_allocated(&candidates[candidate].az_names);

        Some(Self {
            state,
            network,
            candidate,
            az_order,
            next_az: 0,
        })
    }
}

impl Iterator for SearchFrame {
    type Item = NetworkPlacements;

    fn next(&mut self) -> Option<NetworkPlacements> {
        let az = self.az_order.get(self.next_az)?.clone();
        self.next_az += 1;

        let mut child = self.state.clone();
        let (_, candidates) = child.get_index_mut(self.network)?;
        candidates.get_mut(self.candidate)?.az_names = vec![az];
        Some(child)
    }
}

/// Zone -> number of IPs placed there, for one network.
fn distribution(placements: &NetworkPlacements) -> Vec<BTreeMap<&str, usize>> {
    placements
        .values()
        .map(|candidates| {
            let mut counts = BTreeMap::new();
            for az in candidates.iter().flat_map(|c| c.az_names.iter()) {
                *counts.entry(az.as_str()).or_insert(0) += 1;
            }
            counts
        })
        .collect()
}

/// Every candidate is pinned to exactly one zone.
pub fn all_resolved(placements: &NetworkPlacements) -> bool {
    placements.values().flatten().all(|c| c.is_resolved())
}

/// Within each network every used zone holds the same number of IPs, and
/// all networks share one zone-to-count table.
pub fn is_evenly_distributed(placements: &NetworkPlacements) -> bool {
    let tables = distribution(placements);

    let balanced = tables.iter().all(|table| {
        let mut counts = table.values();
        match counts.next() {
            Some(first) => counts.all(|count| count == first),
            None => true,
        }
    });

    balanced && tables.iter().collect::<BTreeSet<_>>().len() <= 1
}

/// A state the search may return.
pub fn is_acceptable(placements: &NetworkPlacements) -> bool {
    all_resolved(placements) && is_evenly_distributed(placements)
}
