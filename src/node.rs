//! Node and node-descriptor model (C3).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::port::{Port, PortDescriptor};

/// Identifies the `Context` a `NodeDescriptor` was created by.
///
/// `node_descriptor_create_node` in the original engine read a `context`
/// symbol that wasn't actually a parameter of the function it sat in; a
/// descriptor constructed under one context could end up silently wired to
/// whichever context happened to be in scope. This id closes the hole:
/// every `NodeDescriptor` remembers its owning context, and `Context`
/// refuses to instantiate a node from a descriptor stamped with a
/// different id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextId(pub(crate) u64);

/// The `run` callback a descriptor supplies: reads from input rings, writes
/// to output rings. Must not block and must respect the counts the rings
/// report as available — the core treats it as a black box.
pub type RunFn = Arc<dyn Fn(&Node) + Send + Sync>;

/// An immutable template shared by every `Node` instantiated from it.
///
/// Lives from registration to context teardown. Not `Clone`: one descriptor,
/// one owning context, by construction.
pub struct NodeDescriptor {
    pub(crate) owner: ContextId,
    pub name: String,
    pub description: String,
    pub port_descriptors: Vec<PortDescriptor>,
    pub run: RunFn,
}

impl NodeDescriptor {
    pub(crate) fn new(
        owner: ContextId,
        name: impl Into<String>,
        description: impl Into<String>,
        port_descriptors: Vec<PortDescriptor>,
        run: RunFn,
    ) -> Self {
        Self {
            owner,
            name: name.into(),
            description: description.into(),
            port_descriptors,
            run,
        }
    }

    /// Finds the index of a port descriptor by name, if any.
    pub fn find_port_index(&self, name: &str) -> Option<usize> {
        self.port_descriptors.iter().position(|p| p.name == name)
    }
}

/// A handle to a `NodeDescriptor` registered with a `Context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeDescriptorHandle(pub(crate) usize);

/// A processing unit instantiated from a `NodeDescriptor`.
///
/// `ports` is allocated once at creation and ordered exactly like the
/// descriptor's `port_descriptors`. `set_index` is this node's position in
/// the owning `Context`'s node arena, used for the swap-remove destroy
/// pattern; `being_processed` is the per-node mutual-exclusion flag the
/// manager and worker threads CAS on.
pub struct Node {
    pub descriptor: NodeDescriptorHandle,
    pub ports: Vec<Port>,
    pub set_index: usize,
    pub being_processed: AtomicBool,
    /// Cloned from the owning descriptor at creation time so worker threads
    /// can invoke it without needing shared access to the descriptor arena
    /// while the pipeline is running.
    pub(crate) run: RunFn,
}

impl Node {
    pub(crate) fn new(
        descriptor: NodeDescriptorHandle,
        port_descriptors: &[PortDescriptor],
        run: RunFn,
        set_index: usize,
    ) -> Self {
        let ports = port_descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let layout = crate::port::resolve_channel_layout(port_descriptors, i, &mut vec![i]);
                let rate = crate::port::resolve_sample_rate(port_descriptors, i, &mut vec![i]);
                Port::new(i, d, layout, rate)
            })
            .collect();
        Self {
            descriptor,
            ports,
            set_index,
            being_processed: AtomicBool::new(false),
            run,
        }
    }

    /// Invokes the node's `run` callback.
    #[inline]
    pub fn run(&self) {
        (self.run)(self)
    }

    /// Attempts to claim this node for processing. Returns `true` if the
    /// flag transitioned `false -> true` (the caller now owns the node and
    /// must clear the flag when done); `false` if another actor already
    /// owns it.
    #[inline]
    pub fn try_claim(&self) -> bool {
        self.being_processed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Releases this node, making it eligible for claiming again.
    #[inline]
    pub fn release(&self) {
        self.being_processed.store(false, Ordering::Release);
    }

    /// True if every connected output port's ring currently has no writable
    /// room, i.e. this node has nowhere to deposit further output.
    pub fn all_output_buffers_full(&self) -> bool {
        let mut has_output = false;
        for port in &self.ports {
            if !port.kind.is_output() {
                continue;
            }
            if let Some(ring) = &port.ring {
                has_output = true;
                if ring.writable_bytes() > 0 {
                    return false;
                }
            }
        }
        // A node with no connected outputs (e.g. a playback sink) is never
        // "full" by this definition; its readiness is governed entirely by
        // its inputs.
        has_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{PortDescriptor, PortKind};

    fn descs() -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::new(PortKind::NotesIn, "notes_in"),
            PortDescriptor::new(PortKind::AudioOut, "audio_out"),
        ]
    }

    fn noop_run() -> RunFn {
        Arc::new(|_node: &Node| {})
    }

    #[test]
    fn claim_is_exclusive() {
        let node = Node::new(NodeDescriptorHandle(0), &descs(), noop_run(), 0);
        assert!(node.try_claim());
        assert!(!node.try_claim());
        node.release();
        assert!(node.try_claim());
    }

    #[test]
    fn node_with_no_connected_outputs_is_never_full() {
        let node = Node::new(NodeDescriptorHandle(0), &descs(), noop_run(), 0);
        assert!(!node.all_output_buffers_full());
    }

    #[test]
    fn ports_match_descriptor_order() {
        let node = Node::new(NodeDescriptorHandle(0), &descs(), noop_run(), 0);
        assert_eq!(node.ports[0].kind, PortKind::NotesIn);
        assert_eq!(node.ports[1].kind, PortKind::AudioOut);
    }
}
