//! Static metric catalog for the kubelet summary exporter.
//!
//! Every metric the exporter can ever emit is declared here, once, as a
//! [`MetricDef`] (name, help text, ordered label schema). Definitions are
//! grouped per stats block (`FsGroup`, `MemoryGroup`, ...) so the mapper can
//! walk one block with one routine regardless of which scope it belongs to.
//! [`Catalog`] turns the table into `prometheus` descriptors once at startup.

use prometheus::core::Desc;
use std::collections::HashMap;

/// Label schema for node-scoped metrics.
pub const NODE_LABELS: &[&str] = &["node"];
/// Label schema for node network interface metrics.
pub const NODE_INTERFACE_LABELS: &[&str] = &["node", "name"];
/// Label schema for system container metrics.
pub const SYSTEM_CONTAINER_LABELS: &[&str] = &["node", "container"];
/// Label schema for system container accelerator metrics.
pub const SYSTEM_CONTAINER_ACCELERATOR_LABELS: &[&str] =
    &["node", "container", "id", "model", "make"];
/// Label schema for pod-scoped metrics.
pub const POD_LABELS: &[&str] = &["node", "namespace", "pod"];
/// Label schema for pod volume metrics.
pub const POD_VOLUME_LABELS: &[&str] = &["node", "namespace", "pod", "volume_name"];
/// Label schema for pod network interface metrics.
pub const POD_INTERFACE_LABELS: &[&str] = &["node", "namespace", "pod", "name"];
/// Label schema for container metrics.
pub const CONTAINER_LABELS: &[&str] = &["node", "namespace", "pod", "container"];
/// Label schema for container accelerator metrics.
pub const CONTAINER_ACCELERATOR_LABELS: &[&str] =
    &["node", "namespace", "pod", "container", "id", "model", "make"];

/// Label schema of the error counter; the value is the failure class.
pub const ERROR_LABELS: &[&str] = &["type"];

/// Prometheus value type of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// A single metric definition: fully qualified name, help text and label schema.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricDef {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    pub kind: MetricKind,
}

impl MetricDef {
    pub const fn gauge(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            labels,
            kind: MetricKind::Gauge,
        }
    }

    pub const fn counter(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            labels,
            kind: MetricKind::Counter,
        }
    }

    /// Builds the `prometheus` descriptor for this definition.
    pub fn desc(&self) -> prometheus::Result<Desc> {
        Desc::new(
            self.name.to_string(),
            self.help.to_string(),
            self.labels.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )
    }
}

/// Filesystem-like block (fs, logs, rootfs, ephemeral storage, volumes).
pub struct FsGroup {
    pub usage_bytes: MetricDef,
    pub limit_bytes: MetricDef,
    pub inodes: MetricDef,
    pub inodes_free: MetricDef,
    pub inodes_used: MetricDef,
}

impl FsGroup {
    fn defs(&'static self) -> [&'static MetricDef; 5] {
        [
            &self.usage_bytes,
            &self.limit_bytes,
            &self.inodes,
            &self.inodes_free,
            &self.inodes_used,
        ]
    }
}

pub struct CpuGroup {
    pub usage_nano_cores: MetricDef,
    pub usage_core_nano_seconds: MetricDef,
}

impl CpuGroup {
    fn defs(&'static self) -> [&'static MetricDef; 2] {
        [&self.usage_nano_cores, &self.usage_core_nano_seconds]
    }
}

pub struct MemoryGroup {
    pub available_bytes: MetricDef,
    pub usage_bytes: MetricDef,
    pub working_set_bytes: MetricDef,
    pub rss_bytes: MetricDef,
    pub page_faults: MetricDef,
    pub major_page_faults: MetricDef,
}

impl MemoryGroup {
    fn defs(&'static self) -> [&'static MetricDef; 6] {
        [
            &self.available_bytes,
            &self.usage_bytes,
            &self.working_set_bytes,
            &self.rss_bytes,
            &self.page_faults,
            &self.major_page_faults,
        ]
    }
}

pub struct SwapGroup {
    pub available_bytes: MetricDef,
    pub usage_bytes: MetricDef,
}

impl SwapGroup {
    fn defs(&'static self) -> [&'static MetricDef; 2] {
        [&self.available_bytes, &self.usage_bytes]
    }
}

pub struct InterfaceGroup {
    pub rx_bytes: MetricDef,
    pub rx_errors: MetricDef,
    pub tx_bytes: MetricDef,
    pub tx_errors: MetricDef,
}

impl InterfaceGroup {
    fn defs(&'static self) -> [&'static MetricDef; 4] {
        [&self.rx_bytes, &self.rx_errors, &self.tx_bytes, &self.tx_errors]
    }
}

pub struct AcceleratorGroup {
    pub memory_used: MetricDef,
    pub memory_total: MetricDef,
    pub duty_cycle: MetricDef,
}

impl AcceleratorGroup {
    fn defs(&'static self) -> [&'static MetricDef; 3] {
        [&self.memory_used, &self.memory_total, &self.duty_cycle]
    }
}

pub struct RlimitGroup {
    pub max_pid: MetricDef,
    pub num_of_running_process: MetricDef,
}

pub struct VolumeGroup {
    pub fs: FsGroup,
    pub health_status: MetricDef,
}

macro_rules! fs_group {
    ($prefix:literal, $subject:literal, $labels:expr) => {
        FsGroup {
            usage_bytes: MetricDef::gauge(
                concat!($prefix, "_usage_bytes"),
                concat!("Bytes used in ", $subject),
                $labels,
            ),
            limit_bytes: MetricDef::gauge(
                concat!($prefix, "_limit_bytes"),
                concat!("Capacity of ", $subject, " in bytes"),
                $labels,
            ),
            inodes: MetricDef::gauge(
                concat!($prefix, "_inodes"),
                concat!("Number of inodes in ", $subject),
                $labels,
            ),
            inodes_free: MetricDef::gauge(
                concat!($prefix, "_inodes_free"),
                concat!("Number of free inodes in ", $subject),
                $labels,
            ),
            inodes_used: MetricDef::gauge(
                concat!($prefix, "_inodes_used"),
                concat!("Number of inodes used in ", $subject),
                $labels,
            ),
        }
    };
}

macro_rules! cpu_group {
    ($prefix:literal, $labels:expr) => {
        CpuGroup {
            usage_nano_cores: MetricDef::gauge(
                concat!($prefix, "_usage_nano_cores"),
                "CPU usage in nanocores",
                $labels,
            ),
            usage_core_nano_seconds: MetricDef::gauge(
                concat!($prefix, "_usage_core_nano_seconds"),
                "Cumulative CPU usage in core nanoseconds",
                $labels,
            ),
        }
    };
}

macro_rules! memory_group {
    ($prefix:literal, $subject:literal, $labels:expr) => {
        MemoryGroup {
            available_bytes: MetricDef::gauge(
                concat!($prefix, "_available_bytes"),
                concat!("Available bytes in ", $subject, " memory"),
                $labels,
            ),
            usage_bytes: MetricDef::gauge(
                concat!($prefix, "_usage_bytes"),
                concat!("Used bytes in ", $subject, " memory"),
                $labels,
            ),
            working_set_bytes: MetricDef::gauge(
                concat!($prefix, "_working_set_bytes"),
                concat!("Working set bytes in ", $subject, " memory"),
                $labels,
            ),
            rss_bytes: MetricDef::gauge(
                concat!($prefix, "_rss_bytes"),
                concat!("RSS bytes in ", $subject, " memory"),
                $labels,
            ),
            page_faults: MetricDef::gauge(
                concat!($prefix, "_page_faults"),
                concat!("Cumulative page faults in ", $subject, " memory"),
                $labels,
            ),
            major_page_faults: MetricDef::gauge(
                concat!($prefix, "_major_page_faults"),
                concat!("Cumulative major page faults in ", $subject, " memory"),
                $labels,
            ),
        }
    };
}

macro_rules! swap_group {
    ($prefix:literal, $subject:literal, $labels:expr) => {
        SwapGroup {
            available_bytes: MetricDef::gauge(
                concat!($prefix, "_available_bytes"),
                concat!("Available bytes in ", $subject, " swap"),
                $labels,
            ),
            usage_bytes: MetricDef::gauge(
                concat!($prefix, "_usage_bytes"),
                concat!("Used bytes in ", $subject, " swap"),
                $labels,
            ),
        }
    };
}

macro_rules! interface_group {
    ($prefix:literal, $labels:expr) => {
        InterfaceGroup {
            rx_bytes: MetricDef::gauge(
                concat!($prefix, "_rx_bytes"),
                "Cumulative count of bytes received",
                $labels,
            ),
            rx_errors: MetricDef::gauge(
                concat!($prefix, "_rx_errors"),
                "Cumulative count of receive errors",
                $labels,
            ),
            tx_bytes: MetricDef::gauge(
                concat!($prefix, "_tx_bytes"),
                "Cumulative count of bytes transmitted",
                $labels,
            ),
            tx_errors: MetricDef::gauge(
                concat!($prefix, "_tx_errors"),
                "Cumulative count of transmit errors",
                $labels,
            ),
        }
    };
}

macro_rules! accelerator_group {
    ($prefix:literal, $subject:literal, $labels:expr) => {
        AcceleratorGroup {
            memory_used: MetricDef::gauge(
                concat!($prefix, "_memory_used"),
                concat!("Memory used in bytes by the ", $subject, " accelerator"),
                $labels,
            ),
            memory_total: MetricDef::gauge(
                concat!($prefix, "_memory_total"),
                concat!("Total memory in bytes of the ", $subject, " accelerator"),
                $labels,
            ),
            duty_cycle: MetricDef::gauge(
                concat!($prefix, "_duty_cycle"),
                "Percentage of time over which the accelerator was actively processing",
                $labels,
            ),
        }
    };
}

// ========== Node Scope ==========
pub static NODE_FS: FsGroup = fs_group!("kubelet_summary_node_fs", "the node filesystem", NODE_LABELS);
pub static NODE_RUNTIME_IMAGE_FS: FsGroup = fs_group!(
    "kubelet_summary_node_runtime_image_fs",
    "the runtime image filesystem",
    NODE_LABELS
);
pub static NODE_RUNTIME_CONTAINER_FS: FsGroup = fs_group!(
    "kubelet_summary_node_runtime_container_fs",
    "the runtime writable-layer filesystem",
    NODE_LABELS
);
pub static NODE_CPU: CpuGroup = cpu_group!("kubelet_summary_node_cpu", NODE_LABELS);
pub static NODE_MEMORY: MemoryGroup =
    memory_group!("kubelet_summary_node_memory", "node", NODE_LABELS);
pub static NODE_SWAP: SwapGroup = swap_group!("kubelet_summary_node_swap", "node", NODE_LABELS);
pub static NODE_RLIMIT: RlimitGroup = RlimitGroup {
    max_pid: MetricDef::gauge(
        "kubelet_summary_node_rlimit_max_pid",
        "Maximum number of PIDs on the node",
        NODE_LABELS,
    ),
    num_of_running_process: MetricDef::gauge(
        "kubelet_summary_node_rlimit_num_of_running_process",
        "Number of processes running on the node",
        NODE_LABELS,
    ),
};
pub static NODE_INTERFACE: InterfaceGroup =
    interface_group!("kubelet_summary_node_interface", NODE_INTERFACE_LABELS);

// ========== System Container Scope ==========
pub static SYSTEM_CONTAINER_FS: FsGroup = fs_group!(
    "kubelet_summary_node_system_container_fs",
    "the system container filesystem",
    SYSTEM_CONTAINER_LABELS
);
pub static SYSTEM_CONTAINER_LOGS: FsGroup = fs_group!(
    "kubelet_summary_node_system_container_logs",
    "the system container log storage",
    SYSTEM_CONTAINER_LABELS
);
pub static SYSTEM_CONTAINER_CPU: CpuGroup = cpu_group!(
    "kubelet_summary_node_system_container_cpu",
    SYSTEM_CONTAINER_LABELS
);
pub static SYSTEM_CONTAINER_MEMORY: MemoryGroup = memory_group!(
    "kubelet_summary_node_system_container_memory",
    "system container",
    SYSTEM_CONTAINER_LABELS
);
pub static SYSTEM_CONTAINER_SWAP: SwapGroup = swap_group!(
    "kubelet_summary_node_system_container_swap",
    "system container",
    SYSTEM_CONTAINER_LABELS
);
pub static SYSTEM_CONTAINER_ACCELERATOR: AcceleratorGroup = accelerator_group!(
    "kubelet_summary_node_system_container_accelerator",
    "system container",
    SYSTEM_CONTAINER_ACCELERATOR_LABELS
);

// ========== Pod Scope ==========
pub static POD_CPU: CpuGroup = cpu_group!("kubelet_summary_pod_cpu", POD_LABELS);
pub static POD_MEMORY: MemoryGroup = memory_group!("kubelet_summary_pod_memory", "pod", POD_LABELS);
pub static POD_SWAP: SwapGroup = swap_group!("kubelet_summary_pod_swap", "pod", POD_LABELS);
pub static POD_EPHEMERAL_STORAGE: FsGroup = fs_group!(
    "kubelet_summary_pod_ephemeral_storage",
    "the pod ephemeral storage",
    POD_LABELS
);
pub static POD_PROCESS_COUNT: MetricDef = MetricDef::gauge(
    "kubelet_summary_pod_process_count",
    "Number of processes running in the pod",
    POD_LABELS,
);
pub static POD_VOLUME: VolumeGroup = VolumeGroup {
    fs: fs_group!("kubelet_summary_pod_volume", "the pod volume", POD_VOLUME_LABELS),
    health_status: MetricDef::gauge(
        "kubelet_summary_pod_volume_health_status",
        "Health of the pod volume (1 = abnormal, 0 = normal)",
        POD_VOLUME_LABELS,
    ),
};
pub static POD_INTERFACE: InterfaceGroup =
    interface_group!("kubelet_summary_pod_interface", POD_INTERFACE_LABELS);

// ========== Container Scope ==========
pub static CONTAINER_FS: FsGroup = fs_group!(
    "kubelet_summary_container_fs",
    "the container root filesystem",
    CONTAINER_LABELS
);
pub static CONTAINER_LOGS: FsGroup = fs_group!(
    "kubelet_summary_container_logs",
    "the container log storage",
    CONTAINER_LABELS
);
pub static CONTAINER_CPU: CpuGroup = cpu_group!("kubelet_summary_container_cpu", CONTAINER_LABELS);
pub static CONTAINER_MEMORY: MemoryGroup = memory_group!(
    "kubelet_summary_container_memory",
    "container",
    CONTAINER_LABELS
);
pub static CONTAINER_SWAP: SwapGroup = swap_group!(
    "kubelet_summary_container_swap",
    "container",
    CONTAINER_LABELS
);
pub static CONTAINER_ACCELERATOR: AcceleratorGroup = accelerator_group!(
    "kubelet_summary_container_accelerator",
    "container",
    CONTAINER_ACCELERATOR_LABELS
);

// ========== Exporter ==========
pub static SCRAPE_ERRORS: MetricDef = MetricDef::counter(
    "kubelet_summary_exporter_errors",
    "Errors scraping kubelet stats summary",
    ERROR_LABELS,
);

/// Every data metric definition, in traversal order.
pub fn data_metrics() -> Vec<&'static MetricDef> {
    let mut defs: Vec<&'static MetricDef> = Vec::with_capacity(128);
    defs.extend(NODE_FS.defs());
    defs.extend(NODE_RUNTIME_IMAGE_FS.defs());
    defs.extend(NODE_RUNTIME_CONTAINER_FS.defs());
    defs.extend(NODE_CPU.defs());
    defs.extend(NODE_MEMORY.defs());
    defs.extend(NODE_SWAP.defs());
    defs.push(&NODE_RLIMIT.max_pid);
    defs.push(&NODE_RLIMIT.num_of_running_process);
    defs.extend(NODE_INTERFACE.defs());

    defs.extend(SYSTEM_CONTAINER_FS.defs());
    defs.extend(SYSTEM_CONTAINER_LOGS.defs());
    defs.extend(SYSTEM_CONTAINER_CPU.defs());
    defs.extend(SYSTEM_CONTAINER_MEMORY.defs());
    defs.extend(SYSTEM_CONTAINER_SWAP.defs());
    defs.extend(SYSTEM_CONTAINER_ACCELERATOR.defs());

    defs.extend(POD_CPU.defs());
    defs.extend(POD_MEMORY.defs());
    defs.extend(POD_SWAP.defs());
    defs.extend(POD_EPHEMERAL_STORAGE.defs());
    defs.push(&POD_PROCESS_COUNT);
    defs.extend(POD_VOLUME.fs.defs());
    defs.push(&POD_VOLUME.health_status);
    defs.extend(POD_INTERFACE.defs());

    defs.extend(CONTAINER_FS.defs());
    defs.extend(CONTAINER_LOGS.defs());
    defs.extend(CONTAINER_CPU.defs());
    defs.extend(CONTAINER_MEMORY.defs());
    defs.extend(CONTAINER_SWAP.defs());
    defs.extend(CONTAINER_ACCELERATOR.defs());
    defs
}

/// Immutable set of descriptors built once from the static table.
pub struct Catalog {
    defs: Vec<&'static MetricDef>,
    descs: Vec<Desc>,
}

impl Catalog {
    /// Builds descriptors for every data metric. Fails only if a name or label
    /// in the table is not a valid Prometheus identifier.
    pub fn new() -> prometheus::Result<Self> {
        let defs = data_metrics();
        let descs = defs
            .iter()
            .map(|def| def.desc())
            .collect::<prometheus::Result<Vec<_>>>()?;
        Ok(Self { defs, descs })
    }

    pub fn definitions(&self) -> &[&'static MetricDef] {
        &self.defs
    }

    pub fn descs(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    pub fn get(&self, name: &str) -> Option<&'static MetricDef> {
        self.defs.iter().copied().find(|def| def.name == name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_builds() {
        let catalog = Catalog::new().expect("catalog should build");
        assert_eq!(catalog.len(), catalog.descs().len());
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_metric_names_unique() {
        let mut seen = HashSet::new();
        for def in data_metrics() {
            assert!(seen.insert(def.name), "duplicate metric name {}", def.name);
        }
        assert!(!seen.contains(SCRAPE_ERRORS.name));
    }

    #[test]
    fn test_all_data_metrics_are_gauges() {
        for def in data_metrics() {
            assert_eq!(def.kind, MetricKind::Gauge, "{} should be a gauge", def.name);
            assert!(def.name.starts_with("kubelet_summary_"));
            assert!(!def.help.is_empty());
        }
        assert_eq!(SCRAPE_ERRORS.kind, MetricKind::Counter);
    }

    #[test]
    fn test_label_schemas() {
        assert_eq!(CONTAINER_FS.usage_bytes.labels, &["node", "namespace", "pod", "container"]);
        assert_eq!(
            CONTAINER_ACCELERATOR.duty_cycle.labels,
            &["node", "namespace", "pod", "container", "id", "model", "make"]
        );
        assert_eq!(
            SYSTEM_CONTAINER_ACCELERATOR.memory_used.labels,
            &["node", "container", "id", "model", "make"]
        );
        assert_eq!(POD_VOLUME.health_status.labels, &["node", "namespace", "pod", "volume_name"]);
        assert_eq!(NODE_INTERFACE.rx_bytes.labels, &["node", "name"]);
    }

    #[test]
    fn test_lookup_by_name() {
        let catalog = Catalog::new().unwrap();
        let def = catalog
            .get("kubelet_summary_container_fs_limit_bytes")
            .expect("container fs limit should be declared");
        assert_eq!(def.help, "Capacity of the container root filesystem in bytes");
        assert!(catalog.get("kubelet_summary_nope").is_none());
    }
}
