// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Static IP placement search scenarios and properties.

// Allow unwrap/expect in tests
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::net::{IpAddr, Ipv4Addr};

use ip_placement::{BruteForceIpAllocation, NetworkPlacements, StaticIpCandidate, is_acceptable};
use pretty_assertions::assert_eq;
use quickcheck::{Arbitrary, Gen, quickcheck};

const ZONES: [&str; 3] = ["z1", "z2", "z3"];

fn ip(net: u8, host: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, net, 0, host))
}

fn placements(networks: &[(&str, &[&[&str]])]) -> NetworkPlacements {
    networks
        .iter()
        .enumerate()
        .map(|(n, (name, candidates))| {
            let candidates = candidates
                .iter()
                .enumerate()
                .map(|(h, azs)| StaticIpCandidate::new(ip(n as u8, h as u8 + 1), azs.iter().copied()))
                .collect();
            (name.to_string(), candidates)
        })
        .collect()
}

fn zones_of<'a>(placements: &'a NetworkPlacements, network: &str) -> Vec<&'a str> {
    placements[network]
        .iter()
        .map(|c| c.az().expect("resolved candidate"))
        .collect()
}

fn search(input: &NetworkPlacements) -> Option<NetworkPlacements> {
    BruteForceIpAllocation::new(input.clone()).find_best_combination()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_two_networks_share_two_zones() {
    let input = placements(&[
        ("private", &[&["z1", "z2"], &["z1", "z2"]]),
        ("public", &[&["z1", "z2"], &["z1", "z2"]]),
    ]);

    let placed = search(&input).expect("placement");

    assert_eq!(zones_of(&placed, "private"), vec!["z1", "z2"]);
    assert_eq!(zones_of(&placed, "public"), vec!["z1", "z2"]);
}

#[test]
fn test_pinned_candidate_counts_before_branching() {
    let input = placements(&[("private", &[&["z1"], &["z1", "z2"]])]);

    let placed = search(&input).expect("placement");

    // Both z1/z1 and z1/z2 are balanced; the pinned IP makes z2 the first
    // zone tried.
    assert_eq!(zones_of(&placed, "private"), vec!["z1", "z2"]);
}

#[test]
fn test_uneven_by_construction() {
    let input = placements(&[("private", &[&["z1"], &["z2"], &["z1", "z2"]])]);

    assert_eq!(search(&input), None);
}

#[test]
fn test_backtracks_to_sibling_zone() {
    let input = placements(&[("private", &[&["z1", "z2"]]), ("public", &[&["z2"]])]);

    let placed = search(&input).expect("placement");

    // z1 is less allocated and tried first, but the networks' tables differ.
    assert_eq!(zones_of(&placed, "private"), vec!["z2"]);
}

#[test]
fn test_three_zones() {
    let input = placements(&[("private", &[&ZONES, &ZONES, &ZONES])]);

    let placed = search(&input).expect("placement");

    assert_eq!(zones_of(&placed, "private"), vec!["z1", "z2", "z3"]);
}

#[test]
fn test_networks_with_different_tables_are_rejected() {
    let input = placements(&[("private", &[&["z1"]]), ("public", &[&["z2"]])]);

    assert_eq!(search(&input), None);
}

#[test]
fn test_resolved_input_is_checked_as_is() {
    let balanced = placements(&[("private", &[&["z1"], &["z2"]])]);
    assert_eq!(search(&balanced), Some(balanced.clone()));

    let unbalanced = placements(&[("private", &[&["z1"], &["z1"], &["z2"]])]);
    assert_eq!(search(&unbalanced), None);
}

#[test]
fn test_empty_input() {
    assert_eq!(search(&NetworkPlacements::new()), Some(NetworkPlacements::new()));
}

#[test]
fn test_search_is_deterministic() {
    let input = placements(&[
        ("private", &[&ZONES, &["z1", "z2"], &ZONES]),
        ("public", &[&["z2", "z3"], &ZONES, &["z1", "z3"]]),
    ]);

    let first = search(&input);
    assert!(first.is_some());
    for _ in 0..10 {
        assert_eq!(search(&input), first);
    }
}

#[test]
fn test_input_is_not_modified() {
    let input = placements(&[("private", &[&["z1", "z2"], &["z1", "z2"]])]);
    let allocation = BruteForceIpAllocation::new(input.clone());

    let first = allocation.find_best_combination();
    let second = allocation.find_best_combination();

    assert_eq!(first, second);
    assert_eq!(input["private"][0].az_names.len(), 2);
}

// ============================================================================
// Properties
// ============================================================================

/// Up to two networks of up to three candidates over three zones.
#[derive(Debug, Clone)]
struct SmallPlacements(NetworkPlacements);

impl Arbitrary for SmallPlacements {
    fn arbitrary(g: &mut Gen) -> Self {
        let networks = u8::arbitrary(g) % 2 + 1;

        let placements = (0..networks)
            .map(|n| {
                let count = u8::arbitrary(g) % 4;
                let candidates = (0..count)
                    .map(|h| {
                        let mask = u8::arbitrary(g) % 7 + 1;
                        let azs = ZONES
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| mask & (1 << i) != 0)
                            .map(|(_, az)| *az);
                        StaticIpCandidate::new(ip(n, h + 1), azs)
                    })
                    .collect();
                (format!("net{}", n), candidates)
            })
            .collect();

        SmallPlacements(placements)
    }
}

/// Whether any way of pinning every candidate is acceptable.
fn any_assignment_acceptable(input: &NetworkPlacements) -> bool {
    fn assign(state: &mut NetworkPlacements, slots: &[(usize, usize)], choices: &[Vec<String>]) -> bool {
        let Some(((network, candidate), rest)) = slots.split_first() else {
            return is_acceptable(state);
        };
        let options = &choices[choices.len() - slots.len()];
        options.iter().any(|az| {
            state[*network][*candidate].az_names = vec![az.clone()];
            assign(state, rest, choices)
        })
    }

    let slots: Vec<(usize, usize)> = input
        .values()
        .enumerate()
        .flat_map(|(n, candidates)| (0..candidates.len()).map(move |c| (n, c)))
        .collect();
    let choices: Vec<Vec<String>> = input
        .values()
        .flat_map(|candidates| candidates.iter().map(|c| c.az_names.clone()))
        .collect();

    assign(&mut input.clone(), &slots, &choices)
}

quickcheck! {
    fn solutions_are_acceptable_narrowings(input: SmallPlacements) -> bool {
        let input = input.0;
        match search(&input) {
            None => true,
            Some(placed) => {
                is_acceptable(&placed)
                    && placed.keys().eq(input.keys())
                    && placed.values().zip(input.values()).all(|(out, inp)| {
                        out.len() == inp.len()
                            && out.iter().zip(inp).all(|(o, i)| {
                                o.ip == i.ip && o.az().is_some_and(|az| i.az_names.iter().any(|n| n == az))
                            })
                    })
            }
        }
    }

    fn search_is_complete(input: SmallPlacements) -> bool {
        let input = input.0;
        search(&input).is_some() == any_assignment_acceptable(&input)
    }

    fn search_is_repeatable(input: SmallPlacements) -> bool {
        let input = input.0;
        search(&input) == search(&input)
    }
}
