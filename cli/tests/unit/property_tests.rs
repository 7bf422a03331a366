//! Property-based tests for naming, aggregation and retry invariants.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::cell::Cell;
use std::time::Duration;

use proptest::prelude::*;
use regex::Regex;

use flotilla_cli::application::retry::{RetryError, RetryPolicy, with_retry};
use flotilla_cli::domain::context::{
    append_addresses, append_ids, append_names, recorded_ids, remove_metadata, upsert_metadata,
};
use flotilla_cli::domain::naming::{NamePolicy, random_name};
use flotilla_cli::domain::{
    AddressPair, InstanceHandle, MachineRecord, PipelineContext, validate_config_key,
};

// ============================================================================
// Naming
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Two names drawn for the same basename never collide.
    #[test]
    fn prop_random_names_do_not_collide(base in "[a-z]{1,12}") {
        prop_assert_ne!(random_name(&base), random_name(&base));
    }
}

proptest! {
    /// Plain basenames get a five-letter suffix.
    #[test]
    fn prop_random_name_format(base in "[a-z][a-z0-9]{0,15}") {
        let re = Regex::new(&format!("^{base}-[a-z]{{5}}$")).unwrap();
        let name = random_name(&base);
        prop_assert!(re.is_match(&name), "{name}");
    }

    /// Dotted hostnames only randomize the first label.
    #[test]
    fn prop_dotted_name_keeps_domain(host in "[a-z]{1,8}", domain in "[a-z]{1,8}\\.[a-z]{2,3}") {
        let name = random_name(&format!("{host}.{domain}"));
        let re = Regex::new(&format!("^{host}-[a-z]{{5}}\\.{}$", regex::escape(&domain))).unwrap();
        prop_assert!(re.is_match(&name), "{name}");
    }

    /// A batch of more than one instance never uses the requested name verbatim.
    #[test]
    fn prop_batches_always_randomize(count in 2u32..50, taken in any::<bool>()) {
        let policy = NamePolicy::for_request(Some("web"), count, taken);
        prop_assert_eq!(policy, NamePolicy::Randomized("web".to_owned()));
    }
}

#[test]
fn test_single_free_name_is_used_verbatim() {
    assert_eq!(
        NamePolicy::for_request(Some("web"), 1, false).next_name(),
        "web"
    );
    assert!(
        NamePolicy::for_request(None, 1, false)
            .next_name()
            .starts_with("flotilla-")
    );
}

// ============================================================================
// Aggregation
// ============================================================================

#[derive(Debug, Clone)]
struct Run {
    tag: &'static str,
    ids: Vec<String>,
    /// Which of `ids` got a public address.
    addressed: Vec<bool>,
}

fn run_strategy() -> impl Strategy<Value = Run> {
    (
        prop::sample::select(vec!["openstack", "multipass", "aws"]),
        prop::collection::vec(("[a-f0-9]{4}", any::<bool>()), 0..6),
    )
        .prop_map(|(tag, items)| Run {
            tag,
            ids: items.iter().map(|(id, _)| format!("{tag}-{id}")).collect(),
            addressed: items.iter().map(|(_, a)| *a).collect(),
        })
}

fn apply(ctx: &mut PipelineContext, run: &Run) {
    append_ids(ctx, run.tag, &run.ids);
    for (i, (id, addressed)) in run.ids.iter().zip(&run.addressed).enumerate() {
        if !addressed {
            continue;
        }
        let addresses = AddressPair {
            public: Some(format!("192.0.2.{i}")),
            private: None,
        };
        append_addresses(ctx, run.tag, &addresses);
        append_names(ctx, run.tag, &[format!("name-{id}")]);
        let handle = InstanceHandle::new(id.clone(), format!("name-{id}"));
        upsert_metadata(ctx, MachineRecord::from_handle(&handle, &addresses, run.tag));
    }
}

proptest! {
    /// The cloud aggregate is the concatenation of every run, in order, and
    /// each provider aggregate only holds its own runs.
    #[test]
    fn prop_aggregates_are_additive(runs in prop::collection::vec(run_strategy(), 0..6)) {
        let mut ctx = PipelineContext::default();
        for run in &runs {
            apply(&mut ctx, run);
        }
        let all_ids: Vec<String> = runs.iter().flat_map(|r| r.ids.clone()).collect();
        prop_assert_eq!(&ctx.cloud.ids, &all_ids);
        for (tag, set) in &ctx.providers {
            let own: Vec<String> = runs
                .iter()
                .filter(|r| r.tag == tag.as_str())
                .flat_map(|r| r.ids.clone())
                .collect();
            prop_assert_eq!(&set.ids, &own);
            prop_assert!(set.ips.len() <= set.ids.len());
        }
        let addressed = runs.iter().flat_map(|r| r.addressed.clone()).filter(|a| *a).count();
        prop_assert_eq!(ctx.cloud.ips.len(), addressed);
    }

    /// Metadata holds at most one record per (id, provider).
    #[test]
    fn prop_metadata_is_unique_per_id_and_provider(runs in prop::collection::vec(run_strategy(), 0..6)) {
        let mut ctx = PipelineContext::default();
        for run in runs.iter().chain(runs.iter()) {
            apply(&mut ctx, run);
        }
        let mut keys: Vec<(String, String)> =
            ctx.machines.iter().map(|m| (m.id.clone(), m.provider.clone())).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), total);
    }

    /// Removing every recorded id leaves no metadata for that provider.
    #[test]
    fn prop_removing_recorded_ids_clears_metadata(run in run_strategy()) {
        let mut ctx = PipelineContext::default();
        apply(&mut ctx, &run);
        for id in recorded_ids(&ctx, run.tag) {
            remove_metadata(&mut ctx, &id, run.tag);
        }
        prop_assert_eq!(ctx.machines_for(run.tag).count(), 0);
        prop_assert_eq!(&ctx.provider(run.tag).ids, &run.ids);
    }
}

// ============================================================================
// Retry
// ============================================================================

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime")
}

proptest! {
    /// A retryable failure is attempted exactly `max_attempts` times with one
    /// delay between consecutive attempts.
    #[test]
    fn prop_retry_uses_every_attempt(max in 1u32..15, delay_secs in 0u64..10) {
        let rt = paused_runtime();
        let calls = Cell::new(0u32);
        let retries = Cell::new(0u32);
        let (result, elapsed) = rt.block_on(async {
            let start = tokio::time::Instant::now();
            let result = with_retry(
                RetryPolicy::new(max, Duration::from_secs(delay_secs)),
                |_: &&str| true,
                |_, _| retries.set(retries.get() + 1),
                |_| {
                    calls.set(calls.get() + 1);
                    async { Err::<(), _>("refused") }
                },
            )
            .await;
            (result, start.elapsed())
        });
        prop_assert_eq!(result, Err(RetryError::Exhausted { attempts: max, last: "refused" }));
        prop_assert_eq!(calls.get(), max);
        prop_assert_eq!(retries.get(), max - 1);
        prop_assert_eq!(elapsed.as_secs(), u64::from(max - 1) * delay_secs);
    }

    /// Success on attempt `k` stops retrying.
    #[test]
    fn prop_retry_stops_at_first_success(max in 1u32..15, k in 1u32..15) {
        prop_assume!(k <= max);
        let rt = paused_runtime();
        let result = rt.block_on(with_retry(
            RetryPolicy::new(max, Duration::from_secs(5)),
            |_: &&str| true,
            |_, _| {},
            |attempt| async move {
                if attempt < k { Err("refused") } else { Ok(attempt) }
            },
        ));
        prop_assert_eq!(result, Ok(k));
    }
}

// ============================================================================
// Config keys
// ============================================================================

proptest! {
    /// Arbitrary dotted keys outside the whitelist are rejected.
    #[test]
    fn prop_arbitrary_keys_rejected(key in "[a-z]{1,12}\\.[a-z]{1,12}") {
        prop_assume!(!["ssh.user", "ssh.max_attempts", "ssh.retry_delay_secs"].contains(&key.as_str()));
        prop_assert!(validate_config_key(&key).is_err(), "accepted invalid key: {key}");
    }
}
