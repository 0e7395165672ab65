//! The error taxonomy for the pipeline core.

/// An error surfaced by any fallible operation in the pipeline core.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RivuletError {
    /// Allocation failed while building or growing some part of the graph.
    #[error("allocation failed: {0}")]
    NoMem(&'static str),

    /// The operation is not valid given the current state of its argument.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// `connect_ports` was called with a source/dest pair that aren't Out/In.
    #[error("connect requires an output port as source and an input port as dest")]
    InvalidPortDirection,

    /// `connect_ports` was called across two different media kinds.
    #[error("ports are not of the same media kind")]
    IncompatiblePorts,

    /// Both endpoints of an audio connection are fixed to different channel layouts.
    #[error("incompatible channel layouts: {0:?} vs {1:?}")]
    IncompatibleChannelLayouts(crate::layout::ChannelLayout, crate::layout::ChannelLayout),

    /// Both endpoints of an audio connection are fixed to different sample rates.
    #[error("incompatible sample rates: {0} vs {1}")]
    IncompatibleSampleRates(u32, u32),

    /// Connecting parameter ports is not supported by this engine.
    #[error("param port connections are not implemented")]
    Unimplemented,

    /// An error occurred while enumerating or configuring audio devices.
    #[error("audio device error: {0}")]
    DevicesError(#[from] cpal::DevicesError),

    /// An error occurred building an audio stream.
    #[error("failed to build audio stream: {0}")]
    BuildStreamError(#[from] cpal::BuildStreamError),

    /// An error occurred starting or stopping an audio stream.
    #[error("failed to control audio stream: {0}")]
    PlayStreamError(#[from] cpal::PlayStreamError),

    /// The audio host is unavailable.
    #[error("audio host unavailable: {0}")]
    HostUnavailable(#[from] cpal::HostUnavailable),

    /// Could not read an audio device's name.
    #[error("failed to read device name: {0}")]
    DeviceNameError(#[from] cpal::DeviceNameError),

    /// Could not read an audio device's default stream configuration.
    #[error("failed to read default stream config: {0}")]
    DefaultStreamConfigError(#[from] cpal::DefaultStreamConfigError),

    /// The audio device does not support any usable sample format.
    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    /// An error occurred initializing a MIDI input.
    #[error("midi init error: {0}")]
    MidirInitError(#[from] midir::InitError),

    /// An error occurred connecting to a MIDI port.
    #[error("midi connect error: {0}")]
    MidiConnectError(#[from] midir::ConnectError<midir::MidiInput>),
}

/// A result type for pipeline core operations.
pub type RivuletResult<T> = Result<T, RivuletError>;
