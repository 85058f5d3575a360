use thiserror::Error;

/// Terminal outcome of the native capture step.
///
/// Native status codes are mapped 1:1 onto these variants at the service
/// boundary; callers never see anything rawer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    #[error("native capture service is not initialized")]
    ServiceNotReady,

    #[error("web contents went away before the capture finished")]
    ContentGone,

    #[error("low device memory interrupted the capture")]
    LowMemory,

    #[error("page capture failed")]
    Failed,
}

impl CaptureError {
    /// Whether this failure is a memory-pressure condition.
    pub fn is_memory_pressure(&self) -> bool {
        matches!(self, Self::LowMemory)
    }
}

/// Failure while parsing a capture or compositing a bitmap from it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorError {
    #[error("compositing stopped due to memory pressure")]
    StoppedMemoryPressure,

    #[error("compositing skipped due to memory pressure")]
    SkippedMemoryPressure,

    #[error("compositor failed to initialize")]
    InitFailed,

    #[error("bitmap request failed")]
    BitmapFailed,
}

impl CompositorError {
    /// Whether this failure is a memory-pressure condition. Two distinct
    /// native codes both count.
    pub fn is_memory_pressure(&self) -> bool {
        matches!(self, Self::StoppedMemoryPressure | Self::SkippedMemoryPressure)
    }
}
