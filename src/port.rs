//! Typed port and port-descriptor model (C2).

use std::sync::Arc;

use crate::layout::ChannelLayout;
use crate::ring_buffer::RingBuffer;

/// The six port kinds a node may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    AudioIn,
    AudioOut,
    NotesIn,
    NotesOut,
    ParamIn,
    ParamOut,
}

impl PortKind {
    /// True if this is one of the `*Out` kinds.
    #[inline]
    pub fn is_output(&self) -> bool {
        matches!(self, PortKind::AudioOut | PortKind::NotesOut | PortKind::ParamOut)
    }

    /// True if this is one of the `*In` kinds.
    #[inline]
    pub fn is_input(&self) -> bool {
        !self.is_output()
    }

    /// The media kind this port carries (audio, notes, or param), used to
    /// check that a connection's two ports agree.
    #[inline]
    pub fn media_kind(&self) -> MediaKind {
        match self {
            PortKind::AudioIn | PortKind::AudioOut => MediaKind::Audio,
            PortKind::NotesIn | PortKind::NotesOut => MediaKind::Notes,
            PortKind::ParamIn | PortKind::ParamOut => MediaKind::Param,
        }
    }
}

/// The media carried by a port, independent of direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Notes,
    Param,
}

/// A sibling-port reference used by `same_channel_layout_index` /
/// `same_sample_rate_index`: either "mirror this other port in the same
/// node" or "no mirroring, use the stored default".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorIndex {
    None,
    Port(usize),
}

/// The audio-specific negotiation fields of a port descriptor.
#[derive(Debug, Clone)]
pub struct AudioPortFormat {
    pub channel_layout_fixed: bool,
    pub same_channel_layout_index: MirrorIndex,
    pub channel_layout: ChannelLayout,
    pub sample_rate_fixed: bool,
    pub same_sample_rate_index: MirrorIndex,
    pub sample_rate: u32,
}

impl Default for AudioPortFormat {
    fn default() -> Self {
        Self {
            channel_layout_fixed: false,
            same_channel_layout_index: MirrorIndex::None,
            channel_layout: ChannelLayout::DEFAULT,
            sample_rate_fixed: false,
            same_sample_rate_index: MirrorIndex::None,
            sample_rate: crate::layout::DEFAULT_SAMPLE_RATE,
        }
    }
}

/// An immutable, once-registered template for a port. Shared by every `Port`
/// instantiated from the owning `NodeDescriptor`.
#[derive(Debug, Clone)]
pub struct PortDescriptor {
    pub kind: PortKind,
    pub name: String,
    /// Only meaningful for `AudioIn`/`AudioOut` kinds.
    pub audio_format: AudioPortFormat,
}

impl PortDescriptor {
    /// A non-audio port descriptor (notes or param).
    pub fn new(kind: PortKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            audio_format: AudioPortFormat::default(),
        }
    }

    /// An audio port descriptor with explicit negotiation fields.
    pub fn audio(kind: PortKind, name: impl Into<String>, format: AudioPortFormat) -> Self {
        debug_assert!(matches!(kind, PortKind::AudioIn | PortKind::AudioOut));
        Self {
            kind,
            name: name.into(),
            audio_format: format,
        }
    }
}

/// A handle identifying a port by (node index, port index within the node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortHandle {
    pub node: usize,
    pub port: usize,
}

/// An instantiated port belonging to a `Node`.
///
/// Negotiated audio format fields start equal to the descriptor's defaults
/// and are updated in place by `connect` per the reconciliation table in
/// `crate::context`.
pub struct Port {
    pub descriptor_index: usize,
    pub kind: PortKind,
    pub input_from: Option<PortHandle>,
    pub output_to: Option<PortHandle>,
    pub channel_layout: ChannelLayout,
    pub sample_rate: u32,
    /// Copied straight from the descriptor: whether this port's format is
    /// locked in (typical for hardware-backed nodes) rather than adopted
    /// from whatever its peer negotiates.
    pub channel_layout_fixed: bool,
    pub sample_rate_fixed: bool,
    /// Present once this is an `AudioOut` port that has been connected: the
    /// ring it produces into. Shared with the downstream `AudioIn` port.
    pub ring: Option<Arc<RingBuffer>>,
    /// Bounded event queue for `NotesIn`/`ParamIn`/`NotesOut`/`ParamOut`
    /// ports. Created lazily on connect, same as audio rings.
    pub events: Option<crate::events::EventChannel>,
}

impl Port {
    /// Builds a port from its descriptor. `channel_layout`/`sample_rate`
    /// are the already-resolved values (mirroring via
    /// `same_channel_layout_index`/`same_sample_rate_index` has been
    /// followed by the caller; see `resolve_audio_format`).
    pub(crate) fn new(
        descriptor_index: usize,
        descriptor: &PortDescriptor,
        channel_layout: ChannelLayout,
        sample_rate: u32,
    ) -> Self {
        Self {
            descriptor_index,
            kind: descriptor.kind,
            input_from: None,
            output_to: None,
            channel_layout,
            sample_rate,
            channel_layout_fixed: descriptor.audio_format.channel_layout_fixed,
            sample_rate_fixed: descriptor.audio_format.sample_rate_fixed,
            ring: None,
            events: None,
        }
    }

    /// True if this port currently participates in an edge.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.input_from.is_some() || self.output_to.is_some()
    }
}

/// Resolves the channel layout a fixed audio port should use, following
/// `same_channel_layout_index` to a sibling port's resolved layout when the
/// descriptor mirrors one. Unfixed ports resolve to their descriptor's
/// stored default, since that value is about to be overwritten at connect
/// time anyway.
///
/// `visiting` guards against a malformed descriptor whose mirror indices
/// form a cycle; such a cycle falls back to the descriptor's own stored
/// default rather than looping forever.
pub(crate) fn resolve_channel_layout(
    descriptors: &[PortDescriptor],
    index: usize,
    visiting: &mut Vec<usize>,
) -> ChannelLayout {
    let format = &descriptors[index].audio_format;
    match format.same_channel_layout_index {
        MirrorIndex::None => format.channel_layout,
        MirrorIndex::Port(sibling) => {
            if visiting.contains(&sibling) {
                return format.channel_layout;
            }
            visiting.push(sibling);
            let resolved = resolve_channel_layout(descriptors, sibling, visiting);
            visiting.pop();
            resolved
        }
    }
}

/// Sample-rate analogue of [`resolve_channel_layout`].
pub(crate) fn resolve_sample_rate(
    descriptors: &[PortDescriptor],
    index: usize,
    visiting: &mut Vec<usize>,
) -> u32 {
    let format = &descriptors[index].audio_format;
    match format.same_sample_rate_index {
        MirrorIndex::None => format.sample_rate,
        MirrorIndex::Port(sibling) => {
            if visiting.contains(&sibling) {
                return format.sample_rate;
            }
            visiting.push(sibling);
            let resolved = resolve_sample_rate(descriptors, sibling, visiting);
            visiting.pop();
            resolved
        }
    }
}
