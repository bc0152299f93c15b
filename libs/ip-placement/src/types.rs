// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

use std::net::IpAddr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A statically requested IP and the availability zones it may be placed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaticIpCandidate {
    pub ip: IpAddr,
    pub az_names: Vec<String>,
}

impl StaticIpCandidate {
    pub fn new<S: Into<String>>(ip: IpAddr, az_names: impl IntoIterator<Item = S>) -> Self {
        Self {
            ip,
            az_names: az_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Exactly one eligible zone remains.
    pub fn is_resolved(&self) -> bool {
        self.az_names.len() == 1
    }

    /// More than one eligible zone remains, so the search has to branch.
    pub fn is_undecided(&self) -> bool {
        self.az_names.len() > 1
    }

    /// The zone this IP is placed in, once resolved.
    pub fn az(&self) -> Option<&str> {
        match self.az_names.as_slice() {
            [az] => Some(az.as_str()),
            _ => None,
        }
    }
}

/// Static IP candidates per network name. Iteration follows insertion order.
pub type NetworkPlacements = IndexMap<String, Vec<StaticIpCandidate>>;
