//! Capture device adapter
//!
//! Acquires an audio+video input stream and turns one continuous recording
//! into a single `FinishedMedia` payload.

pub mod adapter;
pub mod buffer;
pub mod device;
pub mod file;
pub mod synthetic;

pub use adapter::CaptureAdapter;
pub use buffer::{CaptureBuffer, FinishedMedia};
pub use device::{
    CaptureDevice, CaptureDeviceFactory, CaptureSource, CaptureSourceConfig, MediaFragment,
    MediaStream, MediaTrack, TrackKind, TrackSet,
};
pub use file::FileCamera;
pub use synthetic::SyntheticCamera;
