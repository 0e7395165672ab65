//! Collaborator interfaces for audio and MIDI hardware (C8 callbacks), plus
//! default implementations backed by `cpal` and `midir`.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::RivuletResult;
use crate::events::EventWakeup;
use crate::layout::ChannelLayout;

/// A snapshot of one audio device's static properties.
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_playback: bool,
    pub is_recording: bool,
    pub default_channel_layout: ChannelLayout,
    pub default_sample_rate: u32,
}

/// A snapshot of one MIDI port's static properties.
#[derive(Debug, Clone)]
pub struct MidiPortInfo {
    pub name: String,
}

/// The audio-hardware collaborator. A real engine treats device enumeration
/// and the underlying driver as external; this crate only needs the
/// surface below.
pub trait AudioHardware: Send + Sync {
    /// Registers a callback invoked whenever the device list changes.
    fn set_on_devices_change(&self, callback: Arc<dyn Fn() + Send + Sync>);

    /// Registers a callback invoked when the hardware has events ready
    /// (e.g. a new buffer request). The callback must not block.
    fn set_on_events_signal(&self, callback: Arc<dyn Fn() + Send + Sync>);

    /// The devices currently known to the hardware.
    fn devices_info(&self) -> Vec<AudioDeviceInfo>;

    /// Drains any internally-queued hardware events without blocking.
    fn flush_events(&self);

    /// Blocks until the backend is fully initialized.
    fn block_until_ready(&self);

    /// Blocks until at least one device is known.
    fn block_until_have_devices(&self);
}

/// The MIDI-hardware collaborator, analogous to [`AudioHardware`].
pub trait MidiHardware: Send + Sync {
    fn set_on_devices_change(&self, callback: Arc<dyn Fn() + Send + Sync>);
    fn set_on_events_signal(&self, callback: Arc<dyn Fn() + Send + Sync>);
    fn ports_info(&self) -> Vec<MidiPortInfo>;
    fn flush_events(&self);
}

/// `cpal`-backed [`AudioHardware`].
///
/// Device enumeration happens eagerly at construction and on an explicit
/// `refresh`; `cpal` itself has no change-notification callback on most
/// backends, so `set_on_devices_change` simply stores the callback for
/// `refresh` to invoke after it observes a different device count.
pub struct CpalAudioHardware {
    host: cpal::Host,
    devices_change: std::sync::Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    events_signal: std::sync::Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    devices: std::sync::Mutex<Vec<AudioDeviceInfo>>,
}

impl CpalAudioHardware {
    /// Opens the default host for the current platform and performs the
    /// first device enumeration.
    pub fn new() -> RivuletResult<Self> {
        let host = cpal::default_host();
        log::info!("audio hardware: using host {:?}", host.id());
        let hw = Self {
            host,
            devices_change: std::sync::Mutex::new(None),
            events_signal: std::sync::Mutex::new(None),
            devices: std::sync::Mutex::new(Vec::new()),
        };
        hw.refresh()?;
        Ok(hw)
    }

    /// Re-enumerates devices, invoking the devices-change callback if the
    /// known set actually changed.
    pub fn refresh(&self) -> RivuletResult<()> {
        let mut infos = Vec::new();
        for device in self.host.output_devices()? {
            let name = device.name()?;
            let config = device.default_output_config();
            let (layout, rate) = match config {
                Ok(cfg) => (
                    ChannelLayout::from_channel_count(cfg.channels()),
                    cfg.sample_rate().0,
                ),
                Err(_) => (ChannelLayout::DEFAULT, crate::layout::DEFAULT_SAMPLE_RATE),
            };
            infos.push(AudioDeviceInfo {
                name,
                is_playback: true,
                is_recording: false,
                default_channel_layout: layout,
                default_sample_rate: rate,
            });
        }
        for device in self.host.input_devices()? {
            let name = device.name()?;
            let config = device.default_input_config();
            let (layout, rate) = match config {
                Ok(cfg) => (
                    ChannelLayout::from_channel_count(cfg.channels()),
                    cfg.sample_rate().0,
                ),
                Err(_) => (ChannelLayout::DEFAULT, crate::layout::DEFAULT_SAMPLE_RATE),
            };
            infos.push(AudioDeviceInfo {
                name,
                is_playback: false,
                is_recording: true,
                default_channel_layout: layout,
                default_sample_rate: rate,
            });
        }

        let changed = {
            let mut guard = self.devices.lock().unwrap();
            let changed = guard.len() != infos.len();
            *guard = infos;
            changed
        };
        if changed {
            if let Some(cb) = self.devices_change.lock().unwrap().as_ref() {
                cb();
            }
        }
        Ok(())
    }
}

impl AudioHardware for CpalAudioHardware {
    fn set_on_devices_change(&self, callback: Arc<dyn Fn() + Send + Sync>) {
        *self.devices_change.lock().unwrap() = Some(callback);
    }

    fn set_on_events_signal(&self, callback: Arc<dyn Fn() + Send + Sync>) {
        *self.events_signal.lock().unwrap() = Some(callback);
    }

    fn devices_info(&self) -> Vec<AudioDeviceInfo> {
        self.devices.lock().unwrap().clone()
    }

    fn flush_events(&self) {
        // cpal streams deliver samples through their own callback threads;
        // there is no separate event queue to drain here.
    }

    fn block_until_ready(&self) {}

    fn block_until_have_devices(&self) {
        while self.devices.lock().unwrap().is_empty() {
            if self.refresh().is_err() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }
}

/// `midir`-backed [`MidiHardware`].
pub struct MidirMidiHardware {
    devices_change: std::sync::Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    events_signal: std::sync::Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl MidirMidiHardware {
    pub fn new(client_name: &str) -> RivuletResult<Self> {
        // Constructing a throwaway `MidiInput` up front validates that the
        // backend initializes correctly and lets us log the port list.
        let input = midir::MidiInput::new(client_name)?;
        log::info!("midi hardware: {} ports available", input.ports().len());
        Ok(Self {
            devices_change: std::sync::Mutex::new(None),
            events_signal: std::sync::Mutex::new(None),
        })
    }
}

impl MidiHardware for MidirMidiHardware {
    fn set_on_devices_change(&self, callback: Arc<dyn Fn() + Send + Sync>) {
        *self.devices_change.lock().unwrap() = Some(callback);
    }

    fn set_on_events_signal(&self, callback: Arc<dyn Fn() + Send + Sync>) {
        *self.events_signal.lock().unwrap() = Some(callback);
    }

    fn ports_info(&self) -> Vec<MidiPortInfo> {
        match midir::MidiInput::new("rivulet port scan") {
            Ok(input) => input
                .ports()
                .iter()
                .map(|p| MidiPortInfo {
                    name: input.port_name(p).unwrap_or_else(|_| "unknown".into()),
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn flush_events(&self) {}
}

/// Creates the default MIDI hardware collaborator.
pub fn create_midi_hardware(client_name: &str) -> RivuletResult<Box<dyn MidiHardware>> {
    Ok(Box::new(MidirMidiHardware::new(client_name)?))
}

#[cfg(test)]
pub mod fake {
    //! In-memory [`AudioHardware`]/[`MidiHardware`] pair for tests, with
    //! manually-triggerable devices-changed / events-signal callbacks so
    //! end-to-end scenarios don't need real hardware.
    use super::*;
    use std::sync::Mutex;

    pub struct FakeAudioHardware {
        devices: Mutex<Vec<AudioDeviceInfo>>,
        devices_change: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
        events_signal: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    }

    impl FakeAudioHardware {
        pub fn new(devices: Vec<AudioDeviceInfo>) -> Self {
            Self {
                devices: Mutex::new(devices),
                devices_change: Mutex::new(None),
                events_signal: Mutex::new(None),
            }
        }

        pub fn set_devices(&self, devices: Vec<AudioDeviceInfo>) {
            *self.devices.lock().unwrap() = devices;
            if let Some(cb) = self.devices_change.lock().unwrap().as_ref() {
                cb();
            }
        }

        pub fn trigger_events_signal(&self) {
            if let Some(cb) = self.events_signal.lock().unwrap().as_ref() {
                cb();
            }
        }
    }

    impl AudioHardware for FakeAudioHardware {
        fn set_on_devices_change(&self, callback: Arc<dyn Fn() + Send + Sync>) {
            *self.devices_change.lock().unwrap() = Some(callback);
        }

        fn set_on_events_signal(&self, callback: Arc<dyn Fn() + Send + Sync>) {
            *self.events_signal.lock().unwrap() = Some(callback);
        }

        fn devices_info(&self) -> Vec<AudioDeviceInfo> {
            self.devices.lock().unwrap().clone()
        }

        fn flush_events(&self) {}
        fn block_until_ready(&self) {}
        fn block_until_have_devices(&self) {}
    }

    pub struct FakeMidiHardware {
        ports: Mutex<Vec<MidiPortInfo>>,
        devices_change: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
        events_signal: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    }

    impl FakeMidiHardware {
        pub fn new(ports: Vec<MidiPortInfo>) -> Self {
            Self {
                ports: Mutex::new(ports),
                devices_change: Mutex::new(None),
                events_signal: Mutex::new(None),
            }
        }

        pub fn trigger_events_signal(&self) {
            if let Some(cb) = self.events_signal.lock().unwrap().as_ref() {
                cb();
            }
        }
    }

    impl MidiHardware for FakeMidiHardware {
        fn set_on_devices_change(&self, callback: Arc<dyn Fn() + Send + Sync>) {
            *self.devices_change.lock().unwrap() = Some(callback);
        }

        fn set_on_events_signal(&self, callback: Arc<dyn Fn() + Send + Sync>) {
            *self.events_signal.lock().unwrap() = Some(callback);
        }

        fn ports_info(&self) -> Vec<MidiPortInfo> {
            self.ports.lock().unwrap().clone()
        }

        fn flush_events(&self) {}
    }

    #[test]
    fn fake_audio_hardware_reports_devices() {
        let hw = FakeAudioHardware::new(vec![AudioDeviceInfo {
            name: "fake out".into(),
            is_playback: true,
            is_recording: false,
            default_channel_layout: ChannelLayout::Stereo,
            default_sample_rate: 44_100,
        }]);
        assert_eq!(hw.devices_info().len(), 1);
    }

    #[test]
    fn events_signal_invokes_registered_callback() {
        let hw = FakeAudioHardware::new(vec![]);
        let wakeup = EventWakeup::new();
        let w2 = wakeup.clone();
        hw.set_on_events_signal(Arc::new(move || w2.wakeup()));
        hw.trigger_events_signal();
        wakeup.wait();
    }
}
