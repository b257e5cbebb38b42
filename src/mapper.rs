//! Flattens a decoded [`Summary`] into labeled observations.
//!
//! Label values come only from the ownership path of a leaf
//! (node → system container | pod → container → volume/interface/accelerator).
//! Leaves that are absent in the document produce nothing.

use crate::catalog::{
    AcceleratorGroup, CpuGroup, FsGroup, InterfaceGroup, MemoryGroup, MetricDef, SwapGroup,
    CONTAINER_ACCELERATOR, CONTAINER_CPU, CONTAINER_FS, CONTAINER_LOGS, CONTAINER_MEMORY,
    CONTAINER_SWAP, NODE_CPU, NODE_FS, NODE_INTERFACE, NODE_MEMORY, NODE_RLIMIT,
    NODE_RUNTIME_CONTAINER_FS, NODE_RUNTIME_IMAGE_FS, NODE_SWAP, POD_CPU, POD_EPHEMERAL_STORAGE,
    POD_INTERFACE, POD_MEMORY, POD_PROCESS_COUNT, POD_SWAP, POD_VOLUME, SYSTEM_CONTAINER_ACCELERATOR,
    SYSTEM_CONTAINER_CPU, SYSTEM_CONTAINER_FS, SYSTEM_CONTAINER_LOGS, SYSTEM_CONTAINER_MEMORY,
    SYSTEM_CONTAINER_SWAP,
};
use crate::summary::{
    AcceleratorStats, ContainerStats, CpuStats, FsStats, MemoryStats, NetworkStats, NodeStats,
    PodStats, Summary, SwapStats,
};

/// One emitted sample: descriptor, label values in schema order, value.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric: &'static MetricDef,
    pub labels: Vec<String>,
    pub value: f64,
}

impl Observation {
    /// Label value for `name`, if the descriptor declares that label.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.metric
            .labels
            .iter()
            .position(|l| *l == name)
            .and_then(|idx| self.labels.get(idx))
            .map(String::as_str)
    }
}

/// Maps every present leaf of `summary` to an observation.
pub fn map_summary(summary: &Summary) -> Vec<Observation> {
    let mut emitter = Emitter::default();
    emitter.node(&summary.node);

    let node = summary.node.node_name.as_str();
    for pod in &summary.pods {
        emitter.pod(node, pod);
    }
    emitter.observations
}

#[derive(Default)]
struct Emitter {
    observations: Vec<Observation>,
}

impl Emitter {
    /// Records `value` under `metric` if present.
    fn emit(&mut self, metric: &'static MetricDef, labels: &[&str], value: Option<u64>) {
        let Some(value) = value else {
            return;
        };
        debug_assert_eq!(
            labels.len(),
            metric.labels.len(),
            "label arity mismatch for {}",
            metric.name
        );
        self.observations.push(Observation {
            metric,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            value: value as f64,
        });
    }

    fn fs(&mut self, group: &'static FsGroup, labels: &[&str], fs: Option<&FsStats>) {
        let Some(fs) = fs else {
            return;
        };
        self.emit(&group.usage_bytes, labels, fs.used_bytes);
        self.emit(&group.limit_bytes, labels, fs.capacity_bytes);
        self.emit(&group.inodes, labels, fs.inodes);
        self.emit(&group.inodes_free, labels, fs.inodes_free);
        self.emit(&group.inodes_used, labels, fs.inodes_used);
    }

    fn cpu(&mut self, group: &'static CpuGroup, labels: &[&str], cpu: Option<&CpuStats>) {
        let Some(cpu) = cpu else {
            return;
        };
        self.emit(&group.usage_nano_cores, labels, cpu.usage_nano_cores);
        self.emit(&group.usage_core_nano_seconds, labels, cpu.usage_core_nano_seconds);
    }

    fn memory(&mut self, group: &'static MemoryGroup, labels: &[&str], mem: Option<&MemoryStats>) {
        let Some(mem) = mem else {
            return;
        };
        self.emit(&group.available_bytes, labels, mem.available_bytes);
        self.emit(&group.usage_bytes, labels, mem.usage_bytes);
        self.emit(&group.working_set_bytes, labels, mem.working_set_bytes);
        self.emit(&group.rss_bytes, labels, mem.rss_bytes);
        self.emit(&group.page_faults, labels, mem.page_faults);
        self.emit(&group.major_page_faults, labels, mem.major_page_faults);
    }

    fn swap(&mut self, group: &'static SwapGroup, labels: &[&str], swap: Option<&SwapStats>) {
        let Some(swap) = swap else {
            return;
        };
        self.emit(&group.available_bytes, labels, swap.swap_available_bytes);
        self.emit(&group.usage_bytes, labels, swap.swap_usage_bytes);
    }

    fn interfaces(
        &mut self,
        group: &'static InterfaceGroup,
        parent: &[&str],
        network: Option<&NetworkStats>,
    ) {
        let Some(network) = network else {
            return;
        };
        for iface in &network.interfaces {
            let labels = with(parent, &[iface.name.as_str()]);
            self.emit(&group.rx_bytes, &labels, iface.rx_bytes);
            self.emit(&group.rx_errors, &labels, iface.rx_errors);
            self.emit(&group.tx_bytes, &labels, iface.tx_bytes);
            self.emit(&group.tx_errors, &labels, iface.tx_errors);
        }
    }

    fn accelerators(
        &mut self,
        group: &'static AcceleratorGroup,
        parent: &[&str],
        accelerators: &[AcceleratorStats],
    ) {
        for acc in accelerators {
            let labels = with(parent, &[acc.id.as_str(), acc.model.as_str(), acc.make.as_str()]);
            self.emit(&group.memory_used, &labels, Some(acc.memory_used));
            self.emit(&group.memory_total, &labels, Some(acc.memory_total));
            self.emit(&group.duty_cycle, &labels, Some(acc.duty_cycle));
        }
    }

    fn node(&mut self, node: &NodeStats) {
        let labels = [node.node_name.as_str()];
        let runtime = node.runtime.as_ref();

        self.fs(&NODE_FS, &labels, node.fs.as_ref());
        self.fs(
            &NODE_RUNTIME_IMAGE_FS,
            &labels,
            runtime.and_then(|r| r.image_fs.as_ref()),
        );
        self.fs(
            &NODE_RUNTIME_CONTAINER_FS,
            &labels,
            runtime.and_then(|r| r.container_fs.as_ref()),
        );
        self.cpu(&NODE_CPU, &labels, node.cpu.as_ref());
        self.memory(&NODE_MEMORY, &labels, node.memory.as_ref());
        self.swap(&NODE_SWAP, &labels, node.swap.as_ref());
        if let Some(rlimit) = &node.rlimit {
            self.emit(&NODE_RLIMIT.max_pid, &labels, rlimit.max_pid);
            self.emit(
                &NODE_RLIMIT.num_of_running_process,
                &labels,
                rlimit.num_of_running_processes,
            );
        }
        self.interfaces(&NODE_INTERFACE, &labels, node.network.as_ref());

        for container in &node.system_containers {
            self.system_container(&node.node_name, container);
        }
    }

    fn system_container(&mut self, node: &str, container: &ContainerStats) {
        let labels = [node, container.name.as_str()];
        self.fs(&SYSTEM_CONTAINER_FS, &labels, container.rootfs.as_ref());
        self.fs(&SYSTEM_CONTAINER_LOGS, &labels, container.logs.as_ref());
        self.cpu(&SYSTEM_CONTAINER_CPU, &labels, container.cpu.as_ref());
        self.memory(&SYSTEM_CONTAINER_MEMORY, &labels, container.memory.as_ref());
        self.swap(&SYSTEM_CONTAINER_SWAP, &labels, container.swap.as_ref());
        self.accelerators(&SYSTEM_CONTAINER_ACCELERATOR, &labels, &container.accelerators);
    }

    fn pod(&mut self, node: &str, pod: &PodStats) {
        let labels = [node, pod.pod_ref.namespace.as_str(), pod.pod_ref.name.as_str()];

        self.cpu(&POD_CPU, &labels, pod.cpu.as_ref());
        self.memory(&POD_MEMORY, &labels, pod.memory.as_ref());
        self.swap(&POD_SWAP, &labels, pod.swap.as_ref());
        self.fs(&POD_EPHEMERAL_STORAGE, &labels, pod.ephemeral_storage.as_ref());
        if let Some(process_stats) = &pod.process_stats {
            self.emit(&POD_PROCESS_COUNT, &labels, process_stats.process_count);
        }

        for volume in &pod.volume_stats {
            let volume_labels = with(&labels, &[volume.name.as_str()]);
            self.fs(&POD_VOLUME.fs, &volume_labels, Some(&volume.fs_stats));
            if let Some(health) = &volume.volume_health_stats {
                self.emit(
                    &POD_VOLUME.health_status,
                    &volume_labels,
                    Some(u64::from(health.abnormal)),
                );
            }
        }

        self.interfaces(&POD_INTERFACE, &labels, pod.network.as_ref());

        for container in &pod.containers {
            self.container(&labels, container);
        }
    }

    fn container(&mut self, pod_labels: &[&str], container: &ContainerStats) {
        let labels = with(pod_labels, &[container.name.as_str()]);
        self.fs(&CONTAINER_FS, &labels, container.rootfs.as_ref());
        self.fs(&CONTAINER_LOGS, &labels, container.logs.as_ref());
        self.cpu(&CONTAINER_CPU, &labels, container.cpu.as_ref());
        self.memory(&CONTAINER_MEMORY, &labels, container.memory.as_ref());
        self.swap(&CONTAINER_SWAP, &labels, container.swap.as_ref());
        self.accelerators(&CONTAINER_ACCELERATOR, &labels, &container.accelerators);
    }
}

fn with<'a>(parent: &[&'a str], extra: &[&'a str]) -> Vec<&'a str> {
    let mut labels = Vec::with_capacity(parent.len() + extra.len());
    labels.extend_from_slice(parent);
    labels.extend_from_slice(extra);
    labels
}
