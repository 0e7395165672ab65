//! A real-time audio processing pipeline: a directed graph of nodes whose
//! typed ports carry audio, MIDI-note, and parameter streams, scheduled by
//! a manager thread over a pool of worker threads.
//!
//! The DSP body of any individual node (a synth oscillator, an effect) is
//! supplied by the application as a `run` callback; this crate only owns
//! the graph, the port-compatibility resolver, the lock-free buffering
//! between nodes, and the scheduler that keeps at most one worker running
//! any given node at a time.

use cpal::traits::HostTrait;

pub mod builder;
pub mod context;
pub mod error;
pub mod events;
pub mod hardware;
pub mod layout;
pub mod node;
pub mod port;
pub mod ring_buffer;
pub mod sample;
pub mod scheduler;
pub mod task_queue;

#[allow(unused_imports)]
pub mod prelude {
    pub use crate::builder::{NodeHandle, PortRef};
    pub use crate::context::Context;
    pub use crate::error::{RivuletError, RivuletResult};
    pub use crate::hardware::{AudioDeviceInfo, AudioHardware, MidiHardware, MidiPortInfo};
    pub use crate::layout::ChannelLayout;
    pub use crate::node::{NodeDescriptor, NodeDescriptorHandle, RunFn};
    pub use crate::port::{AudioPortFormat, MirrorIndex, PortDescriptor, PortHandle, PortKind};
    pub use crate::sample::Sample;
}

/// The audio backend (host) to use when constructing the default
/// `cpal`-backed [`hardware::CpalAudioHardware`].
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    #[default]
    /// Default audio backend for the current platform.
    Default,
    #[cfg(all(target_os = "linux", feature = "jack"))]
    /// JACK Audio Connection Kit
    Jack,
    #[cfg(target_os = "linux")]
    /// Advanced Linux Sound Architecture
    Alsa,
    #[cfg(target_os = "windows")]
    /// Windows Audio Session API
    Wasapi,
}

/// Lists every audio backend `cpal` reports as available on this platform.
pub fn available_backends() -> Vec<Backend> {
    let mut backends = vec![Backend::Default];
    for host in cpal::available_hosts() {
        match host {
            #[cfg(all(target_os = "linux", feature = "jack"))]
            cpal::HostId::Jack => backends.push(Backend::Jack),
            #[cfg(target_os = "linux")]
            cpal::HostId::Alsa => backends.push(Backend::Alsa),
            #[cfg(target_os = "windows")]
            cpal::HostId::Wasapi => backends.push(Backend::Wasapi),
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }
    backends
}

/// The backend used when none is explicitly selected.
pub fn default_backend() -> Backend {
    Backend::Default
}

/// Prints every available backend to stdout, for CLI-style diagnostics.
pub fn list_backends() {
    println!("available backends:");
    for (i, backend) in available_backends().into_iter().enumerate() {
        println!("  {i}: {backend:?}");
    }
}

/// Prints every output device name under `backend` to stdout.
pub fn list_devices(backend: Backend) {
    println!("devices for backend {backend:?}:");
    let host = match backend {
        Backend::Default => cpal::default_host(),
        #[cfg(all(target_os = "linux", feature = "jack"))]
        Backend::Jack => cpal::host_from_id(cpal::HostId::Jack).unwrap(),
        #[cfg(target_os = "linux")]
        Backend::Alsa => cpal::host_from_id(cpal::HostId::Alsa).unwrap(),
        #[cfg(target_os = "windows")]
        Backend::Wasapi => cpal::host_from_id(cpal::HostId::Wasapi).unwrap(),
    };
    match host.output_devices() {
        Ok(devices) => {
            for (i, device) in devices.enumerate() {
                println!("  {i}: {:?}", device.name());
            }
        }
        Err(e) => log::error!("failed to enumerate devices: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::RivuletError;
    use crate::hardware::fake::{FakeAudioHardware, FakeMidiHardware};
    use crate::hardware::{AudioDeviceInfo, MidiPortInfo};
    use crate::layout::ChannelLayout;
    use crate::node::Node;
    use crate::port::{PortDescriptor, PortHandle, PortKind};
    use std::sync::Arc;

    fn test_context() -> Context {
        Context::new(
            Box::new(FakeAudioHardware::new(vec![])),
            Box::new(FakeMidiHardware::new(vec![])),
        )
        .unwrap()
    }

    #[test]
    fn default_backend_is_default() {
        assert_eq!(default_backend(), Backend::Default);
    }

    // End-to-end scenario 1: the synth descriptor exists with the right
    // port shape as soon as a context is created.
    #[test]
    fn synth_descriptor_has_expected_ports() {
        let ctx = test_context();
        let handle = ctx.node_descriptor_find("synth").expect("synth registered");
        let descriptor = ctx.node_descriptor(handle);
        assert_eq!(descriptor.port_descriptors.len(), 2);
        assert_eq!(descriptor.port_descriptors[0].kind, PortKind::NotesIn);
        assert_eq!(descriptor.port_descriptors[1].kind, PortKind::AudioOut);
        assert!(!descriptor.port_descriptors[1].audio_format.channel_layout_fixed);
    }

    // End-to-end scenario 2: MIDI -> synth -> playback negotiates the
    // playback device's fixed stereo/44100 format onto the synth's
    // previously-unfixed audio_out port.
    #[test]
    fn connect_midi_synth_playback_resolves_audio_out_to_device_format() {
        let mut ctx = test_context();

        let midi_port = MidiPortInfo {
            name: "fake midi".into(),
        };
        let midi_desc = ctx.midi_device_create_node_descriptor(&midi_port);

        let synth_desc = ctx.node_descriptor_find("synth").unwrap();

        let device = AudioDeviceInfo {
            name: "fake playback".into(),
            is_playback: true,
            is_recording: false,
            default_channel_layout: ChannelLayout::Stereo,
            default_sample_rate: 44_100,
        };
        let playback_desc = ctx.audio_device_create_node_descriptor(&device).unwrap();

        let midi_node = ctx.create_node(midi_desc).unwrap();
        let synth_node = ctx.create_node(synth_desc).unwrap();
        let playback_node = ctx.create_node(playback_desc).unwrap();

        ctx.connect_ports(
            PortHandle { node: midi_node, port: 0 },
            PortHandle { node: synth_node, port: 0 },
        )
        .unwrap();

        ctx.connect_ports(
            PortHandle { node: synth_node, port: 1 },
            PortHandle { node: playback_node, port: 0 },
        )
        .unwrap();

        let synth_out = ctx
            .node_port(PortHandle { node: synth_node, port: 1 })
            .unwrap();
        assert_eq!(synth_out.channel_layout, ChannelLayout::Stereo);
        assert_eq!(synth_out.sample_rate, 44_100);
    }

    // End-to-end scenario 3: reconnecting the (now-resolved) synth output
    // to a second, differently-fixed device overwrites the prior edge and
    // re-resolves to the new device's format.
    #[test]
    fn reconnecting_output_overwrites_prior_edge_and_reresolves() {
        let mut ctx = test_context();
        let synth_desc = ctx.node_descriptor_find("synth").unwrap();
        let synth_node = ctx.create_node(synth_desc).unwrap();

        let device_a = AudioDeviceInfo {
            name: "a".into(),
            is_playback: true,
            is_recording: false,
            default_channel_layout: ChannelLayout::Stereo,
            default_sample_rate: 44_100,
        };
        let device_b = AudioDeviceInfo {
            name: "b".into(),
            is_playback: true,
            is_recording: false,
            default_channel_layout: ChannelLayout::Stereo,
            default_sample_rate: 48_000,
        };
        let desc_a = ctx.audio_device_create_node_descriptor(&device_a).unwrap();
        let desc_b = ctx.audio_device_create_node_descriptor(&device_b).unwrap();
        let node_a = ctx.create_node(desc_a).unwrap();
        let node_b = ctx.create_node(desc_b).unwrap();

        ctx.connect_ports(
            PortHandle { node: synth_node, port: 1 },
            PortHandle { node: node_a, port: 0 },
        )
        .unwrap();
        ctx.connect_ports(
            PortHandle { node: synth_node, port: 1 },
            PortHandle { node: node_b, port: 0 },
        )
        .unwrap();

        let synth_out = ctx
            .node_port(PortHandle { node: synth_node, port: 1 })
            .unwrap();
        assert_eq!(synth_out.sample_rate, 48_000);
        assert_eq!(
            synth_out.output_to,
            Some(PortHandle { node: node_b, port: 0 })
        );
    }

    // End-to-end scenario 4: pipeline start immediately followed by stop
    // exits cleanly with no leaked nodes.
    #[test]
    fn pipeline_start_then_stop_is_clean() {
        let mut ctx = test_context();
        let synth_desc = ctx.node_descriptor_find("synth").unwrap();
        ctx.create_node(synth_desc).unwrap();

        ctx.start_pipeline().unwrap();
        assert!(ctx.is_pipeline_running());
        std::thread::sleep(std::time::Duration::from_millis(10));
        ctx.stop_pipeline().unwrap();
        assert!(!ctx.is_pipeline_running());
        assert_eq!(ctx.node_count(), 1);
    }

    // End-to-end scenario 5: connecting audio_in (source) -> audio_in
    // (dest) is a direction violation.
    #[test]
    fn direction_error_when_source_is_an_input() {
        let mut ctx = test_context();
        let device = AudioDeviceInfo {
            name: "dev".into(),
            is_playback: true,
            is_recording: false,
            default_channel_layout: ChannelLayout::Stereo,
            default_sample_rate: 48_000,
        };
        let desc = ctx.audio_device_create_node_descriptor(&device).unwrap();
        let n1 = ctx.create_node(desc).unwrap();
        let n2 = ctx.create_node(desc).unwrap();

        let err = ctx
            .connect_ports(
                PortHandle { node: n1, port: 0 }, // audio_in
                PortHandle { node: n2, port: 0 }, // audio_in
            )
            .unwrap_err();
        assert!(matches!(err, RivuletError::InvalidPortDirection));
    }

    // End-to-end scenario 6: destroying a mid-chain node severs both
    // neighboring edges.
    #[test]
    fn destroying_mid_chain_node_severs_both_edges() {
        let mut ctx = test_context();
        let a_desc = ctx.create_node_descriptor("a", "", 1, Arc::new(|_: &Node| {}));
        ctx.node_descriptor_create_port(a_desc, 0, 1, PortDescriptor::new(PortKind::NotesOut, "out"))
            .unwrap();
        let b_desc = ctx.create_node_descriptor("b", "", 2, Arc::new(|_: &Node| {}));
        ctx.node_descriptor_create_port(b_desc, 0, 2, PortDescriptor::new(PortKind::NotesIn, "in"))
            .unwrap();
        ctx.node_descriptor_create_port(b_desc, 1, 2, PortDescriptor::new(PortKind::NotesOut, "out"))
            .unwrap();
        let c_desc = ctx.create_node_descriptor("c", "", 1, Arc::new(|_: &Node| {}));
        ctx.node_descriptor_create_port(c_desc, 0, 1, PortDescriptor::new(PortKind::NotesIn, "in"))
            .unwrap();

        let a = ctx.create_node(a_desc).unwrap();
        let b = ctx.create_node(b_desc).unwrap();
        let c = ctx.create_node(c_desc).unwrap();

        ctx.connect_ports(PortHandle { node: a, port: 0 }, PortHandle { node: b, port: 0 })
            .unwrap();
        ctx.connect_ports(PortHandle { node: b, port: 1 }, PortHandle { node: c, port: 0 })
            .unwrap();

        ctx.destroy_node(b).unwrap();

        let a_port = ctx.node_port(PortHandle { node: a, port: 0 }).unwrap();
        assert_eq!(a_port.output_to, None);
        let c_port = ctx.node_port(PortHandle { node: c, port: 0 }).unwrap();
        assert_eq!(c_port.input_from, None);
        assert_eq!(ctx.node_count(), 2);
    }
}
