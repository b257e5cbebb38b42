//! Kubelet stats summary data model and decoder.
//!
//! Mirrors the JSON document served by the kubelet at `/stats/summary`. Every
//! numeric leaf is an `Option<u64>`: a field missing from the document (or sent
//! as `null`) stays `None` and is never defaulted to zero. Accelerator blocks are
//! the exception, their fields are mandatory.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Error returned when a fetched body cannot be decoded into a [`Summary`].
#[derive(Debug, Error)]
#[error("failed to decode stats summary: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Top-level stats summary: one node and the pods scheduled on it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Summary {
    #[serde(default, deserialize_with = "nullable")]
    pub node: NodeStats,
    #[serde(default, deserialize_with = "nullable")]
    pub pods: Vec<PodStats>,
}

impl Summary {
    /// Decodes a raw response body.
    ///
    /// The body is first read into a generic JSON value, so repeated keys in
    /// one object resolve to the last occurrence, then mapped onto the typed
    /// model. Decoding is all-or-nothing.
    pub fn parse(body: &[u8]) -> Result<Self, DecodeError> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    #[serde(default, deserialize_with = "nullable")]
    pub node_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub system_containers: Vec<ContainerStats>,
    pub cpu: Option<CpuStats>,
    pub memory: Option<MemoryStats>,
    pub network: Option<NetworkStats>,
    pub fs: Option<FsStats>,
    pub runtime: Option<RuntimeStats>,
    pub rlimit: Option<RlimitStats>,
    pub swap: Option<SwapStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStats {
    pub image_fs: Option<FsStats>,
    pub container_fs: Option<FsStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RlimitStats {
    #[serde(rename = "maxpid")]
    pub max_pid: Option<u64>,
    #[serde(rename = "curproc")]
    pub num_of_running_processes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    #[serde(default, deserialize_with = "nullable")]
    pub pod_ref: PodReference,
    #[serde(default, deserialize_with = "nullable")]
    pub containers: Vec<ContainerStats>,
    pub cpu: Option<CpuStats>,
    pub memory: Option<MemoryStats>,
    pub swap: Option<SwapStats>,
    pub network: Option<NetworkStats>,
    #[serde(rename = "volume", default, deserialize_with = "nullable")]
    pub volume_stats: Vec<VolumeStats>,
    #[serde(rename = "ephemeral-storage")]
    pub ephemeral_storage: Option<FsStats>,
    #[serde(rename = "process_stats")]
    pub process_stats: Option<ProcessStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PodReference {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub namespace: String,
}

/// Stats for a pod container or a node system container.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContainerStats {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    pub cpu: Option<CpuStats>,
    pub memory: Option<MemoryStats>,
    #[serde(default, deserialize_with = "nullable")]
    pub accelerators: Vec<AcceleratorStats>,
    pub rootfs: Option<FsStats>,
    pub logs: Option<FsStats>,
    pub swap: Option<SwapStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub usage_nano_cores: Option<u64>,
    pub usage_core_nano_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub available_bytes: Option<u64>,
    pub usage_bytes: Option<u64>,
    pub working_set_bytes: Option<u64>,
    pub rss_bytes: Option<u64>,
    pub page_faults: Option<u64>,
    pub major_page_faults: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapStats {
    pub swap_available_bytes: Option<u64>,
    pub swap_usage_bytes: Option<u64>,
}

/// Accelerator (GPU) usage. All fields are required by the kubelet schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorStats {
    pub make: String,
    pub model: String,
    pub id: String,
    pub memory_total: u64,
    pub memory_used: u64,
    pub duty_cycle: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NetworkStats {
    #[serde(default, deserialize_with = "nullable")]
    pub interfaces: Vec<InterfaceStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStats {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    pub rx_bytes: Option<u64>,
    pub rx_errors: Option<u64>,
    pub tx_bytes: Option<u64>,
    pub tx_errors: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsStats {
    pub available_bytes: Option<u64>,
    pub capacity_bytes: Option<u64>,
    pub used_bytes: Option<u64>,
    pub inodes_free: Option<u64>,
    pub inodes: Option<u64>,
    pub inodes_used: Option<u64>,
}

/// Pod volume: filesystem fields are inlined next to the volume name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    #[serde(flatten)]
    pub fs_stats: FsStats,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    pub volume_health_stats: Option<VolumeHealthStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VolumeHealthStats {
    #[serde(default)]
    pub abnormal: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProcessStats {
    #[serde(rename = "process_count")]
    pub process_count: Option<u64>,
}

/// Kubelet serializes nil slices and empty objects as `null`; treat that like
/// the field being absent.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
