//! Property-based tests for bounded output and hook/topology parsing.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;

use tilewall_cli::domain::topology::with_loopback;
use tilewall_cli::domain::{ClusterTopology, CommandLine, OutputBuffer};

// ============================================================================
// OutputBuffer
// ============================================================================

proptest! {
    /// The buffer never holds more than its bound and counts characters
    /// exactly.
    #[test]
    fn prop_output_buffer_stays_bounded(
        chunks in proptest::collection::vec("[a-zé\n]{0,40}", 0..40),
        max in 1usize..64,
        trim in 1usize..16,
    ) {
        let mut buffer = OutputBuffer::with_limits(max, trim);
        for chunk in &chunks {
            buffer.push(chunk);
            prop_assert!(buffer.len() <= max);
            prop_assert_eq!(buffer.len(), buffer.as_str().chars().count());
        }
    }

    /// What is kept is always the most recent output, and a chunk smaller
    /// than the bound survives whole.
    #[test]
    fn prop_output_buffer_keeps_a_suffix(
        chunks in proptest::collection::vec("[a-z\n]{0,40}", 1..40),
        max in 1usize..64,
    ) {
        let mut buffer = OutputBuffer::with_limits(max, 8);
        for chunk in &chunks {
            buffer.push(chunk);
        }
        let all = chunks.concat();
        prop_assert!(all.ends_with(buffer.as_str()));
        let last = chunks.last().unwrap();
        if last.chars().count() < max {
            prop_assert!(buffer.as_str().ends_with(last.as_str()));
        }
    }
}

// ============================================================================
// Hook lines
// ============================================================================

proptest! {
    /// Splitting a hook line yields exactly its whitespace-separated tokens.
    #[test]
    fn prop_hook_line_tokens(tokens in proptest::collection::vec("[a-z0-9/._+:-]{1,10}", 1..6), sep in "[ \t]{1,3}") {
        let line = tokens.join(&sep);
        let cmd = CommandLine::from_hook_line(&line).unwrap();
        prop_assert_eq!(cmd.argv(), tokens.iter().map(String::as_str).collect::<Vec<_>>());
    }

    /// Blank lines never produce a command.
    #[test]
    fn prop_blank_hook_line_is_skipped(line in "[ \t]{0,8}") {
        prop_assert!(CommandLine::from_hook_line(&line).is_none());
    }
}

// ============================================================================
// Topology
// ============================================================================

proptest! {
    /// Kill targets are the distinct tile hosts in file order, then loopback.
    #[test]
    fn prop_kill_targets_dedup_in_order(octets in proptest::collection::vec(1u8..6, 0..12)) {
        let text: String = octets
            .iter()
            .map(|o| format!("DisplayNode\n  IP 10.0.0.{o}:2000\n"))
            .collect();
        let topology = ClusterTopology::parse(&text).unwrap();

        let mut expected: Vec<String> = Vec::new();
        for o in &octets {
            let host = format!("10.0.0.{o}");
            if !expected.contains(&host) {
                expected.push(host);
            }
        }
        prop_assert_eq!(topology.hosts(), expected.clone());
        prop_assert_eq!(topology.kill_targets(), with_loopback(expected));
    }
}
