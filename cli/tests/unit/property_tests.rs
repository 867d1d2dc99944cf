//! Property-based tests for generation, validation and ordering invariants.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use proptest::prelude::*;
use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::SeedableRng;

use threetier_cli::application::services::{plan_service, synth_service};
use threetier_cli::domain::config::{StackConfig, VALID_CONFIG_KEYS, validate_config_key, validate_config_value};
use threetier_cli::domain::diff::diff;
use threetier_cli::domain::graph::DependencyGraph;
use threetier_cli::domain::resources::network::carve_subnets;
use threetier_cli::domain::resources::secret::{GenerationPolicy, PUNCTUATION};

fn config_with_azs(azs: u8) -> StackConfig {
    let mut cfg = StackConfig::default();
    cfg.set("network.max_azs", &azs.to_string()).expect("valid az count");
    cfg
}

// ============================================================================
// Secret generation
// ============================================================================

proptest! {
    /// With punctuation and space excluded, generated credentials are
    /// alphanumeric and exactly the requested length.
    #[test]
    fn prop_password_never_contains_punctuation_or_space(
        seed in any::<[u8; 32]>(),
        length in 8u32..128,
    ) {
        let policy = GenerationPolicy { password_length: length, ..GenerationPolicy::default() };
        let mut rng = ChaCha20Rng::from_seed(seed);
        let value = policy.generate(&mut rng);
        prop_assert_eq!(value.chars().count(), length as usize);
        prop_assert!(!value.contains(' '), "space in {}", value);
        prop_assert!(!value.chars().any(|c| PUNCTUATION.contains(c)), "punctuation in {}", value);
        prop_assert!(policy.admits(&value));
    }

    /// Every generated character belongs to the policy's charset.
    #[test]
    fn prop_generated_value_is_admitted(
        seed in any::<[u8; 32]>(),
        exclude_punctuation in any::<bool>(),
        include_space in any::<bool>(),
    ) {
        let policy = GenerationPolicy {
            exclude_punctuation,
            include_space,
            ..GenerationPolicy::default()
        };
        let value = policy.generate(&mut ChaCha20Rng::from_seed(seed));
        prop_assert!(policy.admits(&value));
    }
}

// ============================================================================
// Config validation
// ============================================================================

proptest! {
    /// Arbitrary dotted keys outside the whitelist are rejected.
    #[test]
    fn prop_arbitrary_keys_rejected(key in "[a-z]{1,20}\\.[a-z_]{1,20}") {
        prop_assume!(!VALID_CONFIG_KEYS.contains(&key.as_str()));
        prop_assert!(validate_config_key(&key).is_err());
    }

    /// AZ counts outside 1..=6 are rejected; inside are accepted.
    #[test]
    fn prop_max_azs_range(n in 0u16..300) {
        let result = validate_config_value("network.max_azs", &n.to_string());
        prop_assert_eq!(result.is_ok(), (1..=6).contains(&n));
    }
}

// ============================================================================
// Network carving
// ============================================================================

proptest! {
    /// Carved blocks are distinct, share one prefix length, and fit the VPC.
    #[test]
    fn prop_carved_subnets_are_disjoint(count in 1u32..=12, prefix in 16u8..=20) {
        let cidr = format!("10.0.0.0/{prefix}");
        let blocks = carve_subnets(&cidr, count).expect("room for blocks");
        prop_assert_eq!(blocks.len(), count as usize);
        let unique: std::collections::BTreeSet<_> = blocks.iter().collect();
        prop_assert_eq!(unique.len(), blocks.len());
        let sizes: std::collections::BTreeSet<_> =
            blocks.iter().map(|b| b.rsplit('/').next().map(str::to_string)).collect();
        prop_assert_eq!(sizes.len(), 1);
        for block in &blocks {
            prop_assert!(block.starts_with("10.0."), "{} outside {}", block, cidr);
        }
    }
}

// ============================================================================
// Synthesis and ordering
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Synthesis is deterministic: the same declaration yields byte-identical
    /// templates and an empty diff.
    #[test]
    fn prop_synthesis_is_idempotent(azs in 1u8..=6) {
        let cfg = config_with_azs(azs);
        let a = synth_service::synthesize_stack(&cfg).expect("synth");
        let b = synth_service::synthesize_stack(&cfg).expect("synth");
        prop_assert_eq!(&a.digest, &b.digest);
        prop_assert_eq!(
            a.template.to_json_pretty().expect("json"),
            b.template.to_json_pretty().expect("json")
        );
        prop_assert!(diff(&a.template, &b.template).is_empty());
    }

    /// Every resource appears after everything it references.
    #[test]
    fn prop_provisioning_order_respects_dependencies(azs in 1u8..=6) {
        let synthesis = synth_service::synthesize_stack(&config_with_azs(azs)).expect("synth");
        let order = plan_service::plan(&synthesis.template).expect("plan").order();
        prop_assert_eq!(order.len(), synthesis.template.resources.len());
        let graph = DependencyGraph::from_template(&synthesis.template);
        let pos = |id: &str| order.iter().position(|x| x == id).expect("present");
        for id in &order {
            for dep in graph.dependencies_of(id).expect("known") {
                prop_assert!(pos(dep) < pos(id), "{} before its dependency {}", id, dep);
            }
        }
    }

    /// Subnet count scales with the AZ count; everything else is singular.
    #[test]
    fn prop_two_subnets_per_az(azs in 1u8..=6) {
        let synthesis = synth_service::synthesize_stack(&config_with_azs(azs)).expect("synth");
        prop_assert_eq!(
            synthesis.template.count_of_type("AWS::EC2::Subnet"),
            2 * usize::from(azs)
        );
        prop_assert!(!synthesis.report.has_failures());
    }
}
