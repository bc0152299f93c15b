// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Per-zone IP counts used to order search branches.

use std::collections::HashMap;

use crate::types::NetworkPlacements;

/// Number of IPs committed to each availability zone in one search state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationTracker {
    allocated: HashMap<String, usize>,
}

impl AllocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every candidate in `placements` that is already pinned to one
    /// zone, across all networks.
    pub fn from_placements(placements: &NetworkPlacements) -> Self {
        let mut tracker = Self::new();
        placements
            .values()
            .flatten()
            .filter_map(|candidate| candidate.az())
            .for_each(|az| tracker.allocate(az));
        tracker
    }

    pub fn allocate(&mut self, az_name: &str) {
        *self.allocated.entry(az_name.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, az_name: &str) -> usize {
        self.allocated.get(az_name).copied().unwrap_or(0)
    }

    /// `az_names` ordered by ascending allocation count. Zones with equal
    /// counts keep their input order.
    pub fn sort_by_least_allocated(&self, az_names: &[String]) -> Vec<String> {
        let mut sorted = az_names.to_vec();
        sorted.sort_by_key(|az| self.count(az));
        sorted
    }
}
