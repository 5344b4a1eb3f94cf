use crate::catalog::{ImageDescriptor, Orientation, SelectionCriteria};
use crate::error::Error;
use crate::nav::Epoch;

/// User-facing navigation surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Jump(usize),
    ToggleOffline,
    ToggleAttribution,
    SetQuery(String),
    SetOrientation(Orientation),
    Quit,
}

/// Why an image fetch was issued. A display failure flips the engine
/// offline; a prefetch failure is a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchIntent {
    Display,
    Prefetch,
}

/// Work orders from the engine to the fetcher.
#[derive(Debug, Clone)]
pub enum FetchRequest {
    Metadata {
        criteria: SelectionCriteria,
        start: usize,
        count: usize,
        epoch: Epoch,
    },
    Image {
        index: usize,
        url: String,
        intent: FetchIntent,
        epoch: Epoch,
    },
    Probe {
        epoch: Epoch,
    },
}

/// Completions reported back to the engine. Every variant echoes the epoch
/// recorded at issue time so the engine can drop work that predates a
/// reset.
#[derive(Debug)]
pub enum FetchOutcome {
    MetadataReady {
        start: usize,
        images: Vec<ImageDescriptor>,
        epoch: Epoch,
    },
    MetadataFailed {
        start: usize,
        error: Error,
        epoch: Epoch,
    },
    ImageReady {
        index: usize,
        intent: FetchIntent,
        bytes: usize,
        epoch: Epoch,
    },
    ImageFailed {
        index: usize,
        intent: FetchIntent,
        error: Error,
        epoch: Epoch,
    },
    ProbeResult {
        reachable: bool,
        epoch: Epoch,
    },
}

/// Presentation updates for the viewer sink.
#[derive(Debug, Clone)]
pub enum DisplayEvent {
    LoadingScreen(bool),
    Image {
        index: usize,
        descriptor: ImageDescriptor,
    },
    AttributionVisible(bool),
    OfflineIndicator(bool),
}
