//! Pipeline context — the caller-visible result fields shared between steps.
//!
//! All accumulation is additive: a provisioning run appends to whatever
//! earlier steps left behind. Metadata records are the exception; they are
//! keyed by `(id, provider)` and replaced on re-provisioning.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::address::AddressPair;
use crate::domain::instance::InstanceHandle;

/// Parallel result arrays. Index `i` across `ids`/`names` describes the same
/// instance within one run; `ips` only holds instances that got a public
/// address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub private_ips: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

/// Per-instance facts retained for lookup and deprovisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub private_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    pub provider: String,
}

impl MachineRecord {
    /// Build a record from a handle and its resolved addresses.
    #[must_use]
    pub fn from_handle(handle: &InstanceHandle, addresses: &AddressPair, provider: &str) -> Self {
        Self {
            id: handle.id.clone(),
            name: handle.display_name().to_owned(),
            address: addresses.public.clone().unwrap_or_default(),
            private_address: addresses.private_or_empty().to_owned(),
            image: handle.image_ref.clone(),
            flavor: handle.flavor_ref.clone(),
            provider: provider.to_owned(),
        }
    }
}

/// Everything persisted between pipeline steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineContext {
    /// Aggregates across every provider.
    #[serde(default)]
    pub cloud: ResultSet,
    /// Aggregates per provider tag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub providers: BTreeMap<String, ResultSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machines: Vec<MachineRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PipelineContext {
    /// Aggregates for one provider, empty when it never ran.
    #[must_use]
    pub fn provider(&self, tag: &str) -> ResultSet {
        self.providers.get(tag).cloned().unwrap_or_default()
    }

    fn both_sets(&mut self, tag: &str) -> [&mut ResultSet; 2] {
        let provider = self.providers.entry(tag.to_owned()).or_default();
        [&mut self.cloud, provider]
    }

    /// Metadata records for one provider.
    pub fn machines_for<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a MachineRecord> {
        self.machines.iter().filter(move |m| m.provider == tag)
    }
}

/// Append instance ids to the provider and cloud aggregates.
pub fn append_ids(ctx: &mut PipelineContext, provider: &str, ids: &[String]) {
    for set in ctx.both_sets(provider) {
        set.ids.extend_from_slice(ids);
    }
}

/// Append one instance's addresses. Absent addresses are skipped, so `ips`
/// may be shorter than `ids`.
pub fn append_addresses(ctx: &mut PipelineContext, provider: &str, addresses: &AddressPair) {
    for set in ctx.both_sets(provider) {
        if let Some(public) = &addresses.public {
            set.ips.push(public.clone());
        }
        if let Some(private) = &addresses.private {
            set.private_ips.push(private.clone());
        }
    }
}

/// Append instance names.
pub fn append_names(ctx: &mut PipelineContext, provider: &str, names: &[String]) {
    for set in ctx.both_sets(provider) {
        set.names.extend_from_slice(names);
    }
}

/// Insert a metadata record, replacing any record with the same
/// `(id, provider)`.
pub fn upsert_metadata(ctx: &mut PipelineContext, record: MachineRecord) {
    remove_metadata(ctx, &record.id, &record.provider);
    ctx.machines.push(record);
}

/// Drop the metadata record for `(id, provider)`. Returns whether one existed.
pub fn remove_metadata(ctx: &mut PipelineContext, id: &str, provider: &str) -> bool {
    let before = ctx.machines.len();
    ctx.machines
        .retain(|m| !(m.id == id && m.provider == provider));
    ctx.machines.len() != before
}

/// Ids previously recorded for `provider`: the id aggregate first (it
/// includes instances that never became ready), then metadata-only ids.
#[must_use]
pub fn recorded_ids(ctx: &PipelineContext, provider: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let aggregated = ctx.providers.get(provider).map(|s| s.ids.as_slice()).unwrap_or_default();
    let from_records = ctx.machines_for(provider).map(|m| &m.id);
    for id in aggregated.iter().chain(from_records) {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}
