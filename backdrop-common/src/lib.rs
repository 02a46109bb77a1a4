pub mod error;
pub mod image_source;
pub mod style;
pub mod settings;
pub mod fade;
pub mod rotation;
pub mod service;
pub mod duration;
pub mod ipc;

#[cfg(test)]
mod testing;

pub use error::{BackdropError, Result, ErrorReporting};
pub use image_source::{FileHandle, ImageList, ImageRef, ImageSource, LocalVault, Vault};
pub use style::{StyleRule, StyleSink, TransitionEnd, TransitionSignal};
pub use settings::{ConfigStore, Settings};
pub use fade::{FadeTransition, Phase, TransitionState};
pub use rotation::{ApplyOutcome, RotationController, RotationEvent, RotationMode};
pub use service::RotationHandle;
pub use duration::{parse_duration, parse_millis};
pub use ipc::{IpcClient, IpcServer, IpcCommand, IpcResponse, StatusReport};
