// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Availability zone placement for static IPs.
//!
//! Callers hand over, per network, the static IPs an instance group asked for
//! and the zones each IP could live in. [`BruteForceIpAllocation`] narrows
//! every IP to a single zone such that IPs are spread evenly over the zones
//! in use, or reports that no such assignment exists.
//!
//! ```
//! use ip_placement::{BruteForceIpAllocation, NetworkPlacements, StaticIpCandidate};
//!
//! let mut placements = NetworkPlacements::new();
//! placements.insert(
//!     "private".to_string(),
//!     vec![
//!         StaticIpCandidate::new([10, 0, 0, 10].into(), ["z1", "z2"]),
//!         StaticIpCandidate::new([10, 0, 0, 11].into(), ["z1", "z2"]),
//!     ],
//! );
//!
//! let placed = BruteForceIpAllocation::new(placements)
//!     .find_best_combination()
//!     .unwrap_or_default();
//! assert_eq!(placed["private"][0].az(), Some("z1"));
//! assert_eq!(placed["private"][1].az(), Some("z2"));
//! ```

pub mod search;
pub mod tracker;
pub mod types;

pub use search::{BruteForceIpAllocation, is_acceptable};
pub use tracker::AllocationTracker;
pub use types::{NetworkPlacements, StaticIpCandidate};
