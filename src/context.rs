//! The per-instance context: node/descriptor arenas, connection resolver
//! (C4), and pipeline lifecycle (ties together C1–C8).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{RivuletError, RivuletResult};
use crate::events::EventWakeup;
use crate::hardware::{AudioHardware, MidiHardware};
use crate::layout::ChannelLayout;
use crate::node::{ContextId, Node, NodeDescriptor, NodeDescriptorHandle, RunFn};
use crate::port::{AudioPortFormat, MirrorIndex, PortDescriptor, PortHandle, PortKind};
use crate::ring_buffer::RingBuffer;
use crate::scheduler::PipelineHandle;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Approximate per-sample-frame byte size assumed when sizing a freshly
/// connected audio ring: one `f32` per channel.
const BYTES_PER_SAMPLE: usize = 4;

/// Ring latency, in sample frames, used when an audio edge is installed.
/// The ring is sized to twice this many frames so the producer can stay a
/// full block ahead of the consumer without stalling.
const RING_LATENCY_FRAMES: usize = 1024;

/// Holds the node arena across the idle (mutable, graph-editing) and
/// running (immutably shared, scheduler-owned) phases of a pipeline.
enum NodeStorage {
    Idle(Vec<Node>),
    Running(Arc<[Node]>),
}

impl NodeStorage {
    fn len(&self) -> usize {
        match self {
            NodeStorage::Idle(v) => v.len(),
            NodeStorage::Running(v) => v.len(),
        }
    }

    fn as_idle_mut(&mut self) -> RivuletResult<&mut Vec<Node>> {
        match self {
            NodeStorage::Idle(v) => Ok(v),
            NodeStorage::Running(_) => Err(RivuletError::InvalidState(
                "graph cannot be mutated while the pipeline is running",
            )),
        }
    }

    fn as_idle(&self) -> RivuletResult<&[Node]> {
        match self {
            NodeStorage::Idle(v) => Ok(v),
            NodeStorage::Running(_) => Err(RivuletError::InvalidState(
                "graph cannot be inspected by index while the pipeline is running",
            )),
        }
    }
}

/// A process-wide-style singleton-per-instance holding every descriptor,
/// node, and piece of scheduling state for one audio pipeline.
pub struct Context {
    id: ContextId,
    node_descriptors: Vec<NodeDescriptor>,
    nodes: NodeStorage,
    audio_hardware: Box<dyn AudioHardware>,
    midi_hardware: Box<dyn MidiHardware>,
    events: EventWakeup,
    pipeline: Option<PipelineHandle>,
}

/// Ensures the one-shot, process-wide subsystem init (modeled here as the
/// audio-file-codec bootstrap the original engine ran once per process)
/// happens exactly once and is intentionally never torn down.
static INIT: std::sync::Once = std::sync::Once::new();

impl Context {
    /// Creates a new context with the given hardware collaborators.
    pub fn new(
        audio_hardware: Box<dyn AudioHardware>,
        midi_hardware: Box<dyn MidiHardware>,
    ) -> RivuletResult<Self> {
        INIT.call_once(|| {
            log::info!("performing one-time subsystem initialization");
        });

        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        let mut ctx = Self {
            id,
            node_descriptors: Vec::new(),
            nodes: NodeStorage::Idle(Vec::new()),
            audio_hardware,
            midi_hardware,
            events: EventWakeup::new(),
            pipeline: None,
        };

        let events = ctx.events.clone();
        ctx.audio_hardware
            .set_on_events_signal(Arc::new(move || events.wakeup()));
        let events = ctx.events.clone();
        ctx.midi_hardware
            .set_on_events_signal(Arc::new(move || events.wakeup()));

        ctx.register_synth_descriptor();

        log::debug!("context {} created", id.0);
        Ok(ctx)
    }

    fn register_synth_descriptor(&mut self) {
        let descriptor = NodeDescriptor::new(
            self.id,
            "synth",
            "a built-in synthesizer stub: notes in, audio out",
            vec![
                PortDescriptor::new(PortKind::NotesIn, "notes_in"),
                PortDescriptor::audio(
                    PortKind::AudioOut,
                    "audio_out",
                    AudioPortFormat::default(),
                ),
            ],
            Arc::new(|_node: &Node| {
                // The synth's own DSP body is a black box supplied by the
                // application; the core only schedules its invocation.
            }),
        );
        self.node_descriptors.push(descriptor);
    }

    // ---- events (C8) ----------------------------------------------------

    /// Drains both hardware event queues, then blocks until the next
    /// wakeup.
    pub fn flush_events(&self) {
        self.audio_hardware.flush_events();
        self.midi_hardware.flush_events();
        self.events.flush_then_wait();
    }

    /// Blocks until a hardware wakeup has been observed.
    pub fn wait_events(&self) {
        self.events.wait();
    }

    /// Forces a wakeup, as if a hardware callback had fired.
    pub fn wakeup(&self) {
        self.events.wakeup();
    }

    // ---- devices ----------------------------------------------------

    pub fn refresh_audio_devices(&self) {
        // Blocking by contract; our collaborator trait methods are
        // themselves synchronous, so there's nothing further to await.
        self.audio_hardware.block_until_have_devices();
    }

    pub fn audio_devices(&self) -> Vec<crate::hardware::AudioDeviceInfo> {
        self.audio_hardware.devices_info()
    }

    pub fn midi_ports(&self) -> Vec<crate::hardware::MidiPortInfo> {
        self.midi_hardware.ports_info()
    }

    // ---- descriptors ----------------------------------------------------

    /// Finds a registered node descriptor by name.
    pub fn node_descriptor_find(&self, name: &str) -> Option<NodeDescriptorHandle> {
        self.node_descriptors
            .iter()
            .position(|d| d.name == name)
            .map(NodeDescriptorHandle)
    }

    pub fn node_descriptor(&self, handle: NodeDescriptorHandle) -> &NodeDescriptor {
        &self.node_descriptors[handle.0]
    }

    /// Registers a new, empty node descriptor with `port_count` ports to be
    /// filled in via `node_descriptor_create_port`, and the given `run`
    /// callback.
    pub fn create_node_descriptor(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        port_count: usize,
        run: RunFn,
    ) -> NodeDescriptorHandle {
        let descriptor = NodeDescriptor::new(
            self.id,
            name,
            description,
            Vec::with_capacity(port_count),
            run,
        );
        self.node_descriptors.push(descriptor);
        NodeDescriptorHandle(self.node_descriptors.len() - 1)
    }

    /// Appends a port to a descriptor created via `create_node_descriptor`,
    /// at index `port_index`. Returns `None` if `port_index` is out of the
    /// range `[0, port_count)` reserved at creation, mirroring the bounds
    /// check the original engine performs before handing back a port
    /// pointer.
    pub fn node_descriptor_create_port(
        &mut self,
        handle: NodeDescriptorHandle,
        port_index: usize,
        port_count: usize,
        descriptor: PortDescriptor,
    ) -> Option<()> {
        if port_index >= port_count {
            return None;
        }
        let nd = &mut self.node_descriptors[handle.0];
        if nd.port_descriptors.len() <= port_index {
            nd.port_descriptors.resize_with(port_index + 1, || {
                PortDescriptor::new(PortKind::ParamIn, "")
            });
        }
        nd.port_descriptors[port_index] = descriptor;
        Some(())
    }

    /// Builds a playback-sink descriptor for a hardware audio device: a
    /// single fixed `audio_in` port matching the device's native format.
    /// Returns `InvalidState` if the device is not a playback device.
    pub fn audio_device_create_node_descriptor(
        &mut self,
        device: &crate::hardware::AudioDeviceInfo,
    ) -> RivuletResult<NodeDescriptorHandle> {
        if !device.is_playback {
            return Err(RivuletError::InvalidState(
                "audio_device_create_node_descriptor requires a playback device",
            ));
        }
        let format = AudioPortFormat {
            channel_layout_fixed: true,
            same_channel_layout_index: MirrorIndex::None,
            channel_layout: device.default_channel_layout,
            sample_rate_fixed: true,
            same_sample_rate_index: MirrorIndex::None,
            sample_rate: device.default_sample_rate,
        };
        let descriptor = NodeDescriptor::new(
            self.id,
            format!("playback:{}", device.name),
            "audio playback sink",
            vec![PortDescriptor::audio(PortKind::AudioIn, "audio_in", format)],
            Arc::new(|_node: &Node| {
                // Consuming samples from the ring and handing them to the
                // hardware callback is the application's black box.
            }),
        );
        self.node_descriptors.push(descriptor);
        Ok(NodeDescriptorHandle(self.node_descriptors.len() - 1))
    }

    /// Builds a MIDI source descriptor: `notes_out` + `param_out`.
    pub fn midi_device_create_node_descriptor(
        &mut self,
        port: &crate::hardware::MidiPortInfo,
    ) -> NodeDescriptorHandle {
        let descriptor = NodeDescriptor::new(
            self.id,
            format!("midi:{}", port.name),
            "midi input source",
            vec![
                PortDescriptor::new(PortKind::NotesOut, "notes_out"),
                PortDescriptor::new(PortKind::ParamOut, "param_out"),
            ],
            Arc::new(|_node: &Node| {
                // Forwarding hardware MIDI bytes into the notes_out queue
                // happens in the hardware callback, not here.
            }),
        );
        self.node_descriptors.push(descriptor);
        NodeDescriptorHandle(self.node_descriptors.len() - 1)
    }

    // ---- nodes ----------------------------------------------------

    /// Instantiates a node from `handle`. Fails if the descriptor was
    /// registered by a different context, or if the pipeline is running.
    pub fn create_node(&mut self, handle: NodeDescriptorHandle) -> RivuletResult<usize> {
        let descriptor = &self.node_descriptors[handle.0];
        if descriptor.owner != self.id {
            return Err(RivuletError::InvalidState(
                "node descriptor belongs to a different context",
            ));
        }
        let run = descriptor.run.clone();
        let port_descriptors = descriptor.port_descriptors.clone();
        let nodes = self.nodes.as_idle_mut()?;
        let set_index = nodes.len();
        nodes.push(Node::new(handle, &port_descriptors, run, set_index));
        log::debug!("created node {set_index} from descriptor {}", handle.0);
        Ok(set_index)
    }

    /// Destroys a node by swap-remove, fixing up the swapped-in node's
    /// `set_index`, and severs any edges that referenced it.
    pub fn destroy_node(&mut self, index: usize) -> RivuletResult<()> {
        let nodes = self.nodes.as_idle_mut()?;
        if index >= nodes.len() {
            return Ok(());
        }

        // Sever edges pointing at this node's ports before removing it.
        for port_index in 0..nodes[index].ports.len() {
            let (input_from, output_to) = {
                let port = &nodes[index].ports[port_index];
                (port.input_from, port.output_to)
            };
            if let Some(peer) = input_from {
                nodes[peer.node].ports[peer.port].output_to = None;
            }
            if let Some(peer) = output_to {
                nodes[peer.node].ports[peer.port].input_from = None;
            }
        }

        nodes.swap_remove(index);
        if index < nodes.len() {
            nodes[index].set_index = index;
            // Any ports elsewhere pointing at the swapped node's old
            // position must be retargeted to its new index.
            let old_index = nodes.len();
            Self::fixup_swapped_node(nodes, old_index, index);
        }
        log::debug!("destroyed node {index}");
        Ok(())
    }

    fn fixup_swapped_node(nodes: &mut [Node], old_index: usize, new_index: usize) {
        for node in nodes.iter_mut() {
            for port in node.ports.iter_mut() {
                if let Some(h) = port.input_from.as_mut() {
                    if h.node == old_index {
                        h.node = new_index;
                    }
                }
                if let Some(h) = port.output_to.as_mut() {
                    if h.node == old_index {
                        h.node = new_index;
                    }
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_port(&self, handle: PortHandle) -> RivuletResult<&crate::port::Port> {
        let nodes = self.nodes.as_idle()?;
        Ok(&nodes[handle.node].ports[handle.port])
    }

    // ---- connection resolver (C4) ----------------------------------------

    /// Connects `source` to `dest`. See the module-level reconciliation
    /// table for the exact negotiation rules.
    pub fn connect_ports(&mut self, source: PortHandle, dest: PortHandle) -> RivuletResult<()> {
        let nodes = self.nodes.as_idle_mut()?;

        let source_kind = nodes[source.node].ports[source.port].kind;
        let dest_kind = nodes[dest.node].ports[dest.port].kind;

        if !source_kind.is_output() || !dest_kind.is_input() {
            return Err(RivuletError::InvalidPortDirection);
        }
        if source_kind.media_kind() != dest_kind.media_kind() {
            return Err(RivuletError::IncompatiblePorts);
        }

        match source_kind.media_kind() {
            crate::port::MediaKind::Audio => Self::connect_audio(nodes, source, dest)?,
            crate::port::MediaKind::Notes => Self::connect_trivial(nodes, source, dest),
            crate::port::MediaKind::Param => return Err(RivuletError::Unimplemented),
        }

        log::debug!(
            "connected node {} port {} -> node {} port {}",
            source.node,
            source.port,
            dest.node,
            dest.port
        );
        Ok(())
    }

    /// Notes/param connections skip negotiation entirely: just install the
    /// edge on both ports (param never reaches here — it's rejected with
    /// `Unimplemented` before this point).
    fn connect_trivial(nodes: &mut [Node], source: PortHandle, dest: PortHandle) {
        nodes[source.node].ports[source.port].output_to = Some(dest);
        nodes[dest.node].ports[dest.port].input_from = Some(source);
    }

    fn connect_audio(nodes: &mut [Node], source: PortHandle, dest: PortHandle) -> RivuletResult<()> {
        let src_layout_fixed = nodes[source.node].ports[source.port].channel_layout_fixed;
        let dst_layout_fixed = nodes[dest.node].ports[dest.port].channel_layout_fixed;
        let src_rate_fixed = nodes[source.node].ports[source.port].sample_rate_fixed;
        let dst_rate_fixed = nodes[dest.node].ports[dest.port].sample_rate_fixed;

        let src_layout = nodes[source.node].ports[source.port].channel_layout;
        let dst_layout = nodes[dest.node].ports[dest.port].channel_layout;
        let src_rate = nodes[source.node].ports[source.port].sample_rate;
        let dst_rate = nodes[dest.node].ports[dest.port].sample_rate;

        let resolved_layout = match (src_layout_fixed, dst_layout_fixed) {
            (true, true) => {
                if src_layout != dst_layout {
                    return Err(RivuletError::IncompatibleChannelLayouts(src_layout, dst_layout));
                }
                src_layout
            }
            (false, false) => ChannelLayout::DEFAULT,
            (true, false) => src_layout,
            (false, true) => dst_layout,
        };

        let resolved_rate = match (src_rate_fixed, dst_rate_fixed) {
            (true, true) => {
                if src_rate != dst_rate {
                    return Err(RivuletError::IncompatibleSampleRates(src_rate, dst_rate));
                }
                src_rate
            }
            (false, false) => crate::layout::DEFAULT_SAMPLE_RATE,
            (true, false) => src_rate,
            (false, true) => dst_rate,
        };

        nodes[source.node].ports[source.port].channel_layout = resolved_layout;
        nodes[dest.node].ports[dest.port].channel_layout = resolved_layout;
        nodes[source.node].ports[source.port].sample_rate = resolved_rate;
        nodes[dest.node].ports[dest.port].sample_rate = resolved_rate;

        let frame_bytes = resolved_layout.channel_count() as usize * BYTES_PER_SAMPLE;
        let ring = Arc::new(RingBuffer::new(frame_bytes * RING_LATENCY_FRAMES * 2));
        nodes[source.node].ports[source.port].ring = Some(ring.clone());
        nodes[dest.node].ports[dest.port].ring = Some(ring);

        nodes[source.node].ports[source.port].output_to = Some(dest);
        nodes[dest.node].ports[dest.port].input_from = Some(source);

        Ok(())
    }

    // ---- pipeline lifecycle (C6/C7) ----------------------------------------

    /// Starts the manager thread and a worker pool sized to the hardware's
    /// available parallelism. Fails if already running.
    pub fn start_pipeline(&mut self) -> RivuletResult<()> {
        if self.pipeline.is_some() {
            return Err(RivuletError::InvalidState("pipeline already running"));
        }
        let nodes = match std::mem::replace(&mut self.nodes, NodeStorage::Idle(Vec::new())) {
            NodeStorage::Idle(v) => v,
            NodeStorage::Running(_) => unreachable!("pipeline already running, checked above"),
        };
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let arena: Arc<[Node]> = Arc::from(nodes);
        self.nodes = NodeStorage::Running(arena.clone());
        self.pipeline = Some(PipelineHandle::start(arena, worker_count));
        Ok(())
    }

    /// Stops the pipeline, joining the manager and every worker
    /// unconditionally, and restores the node arena for graph editing.
    pub fn stop_pipeline(&mut self) -> RivuletResult<()> {
        let Some(pipeline) = self.pipeline.take() else {
            return Err(RivuletError::InvalidState("pipeline is not running"));
        };
        pipeline.stop();
        let arena = match std::mem::replace(&mut self.nodes, NodeStorage::Idle(Vec::new())) {
            NodeStorage::Running(arena) => arena,
            NodeStorage::Idle(_) => unreachable!("pipeline was running, checked above"),
        };
        let nodes = Arc::try_unwrap(arena)
            .unwrap_or_else(|_| panic!("node arena still shared after pipeline join"))
            .into_vec();
        self.nodes = NodeStorage::Idle(nodes);
        Ok(())
    }

    pub fn is_pipeline_running(&self) -> bool {
        self.pipeline.is_some()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if self.pipeline.is_some() {
            let _ = self.stop_pipeline();
        }
        log::debug!("context {} destroyed", self.id.0);
    }
}
