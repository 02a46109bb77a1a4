//! Single-task event loop that owns the rotation controller.
//!
//! Panel commands, timer ticks and fade completions are all handled on this
//! one task, so the controller never sees two of them at once.

use tokio::sync::{mpsc, oneshot};
use crate::error::{ErrorReporting, IpcError};
use crate::image_source::Vault;
use crate::ipc::{IpcCommand, IpcResponse, StatusReport};
use crate::rotation::{ApplyOutcome, RotationController};
use crate::settings::{MAX_OPACITY, MIN_OPACITY};
use crate::style::StyleSink;
use crate::Result;

#[derive(Debug)]
pub enum Request {
    Command {
        command: IpcCommand,
        respond: oneshot::Sender<IpcResponse>,
    },
    Shutdown,
}

/// Cloneable sender side of the service.
#[derive(Debug, Clone)]
pub struct RotationHandle {
    tx: mpsc::Sender<Request>,
}

impl RotationHandle {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Request>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    pub async fn request(&self, command: IpcCommand) -> Result<IpcResponse> {
        let (respond, reply) = oneshot::channel();
        self.tx
            .send(Request::Command { command, respond })
            .await
            .map_err(|_| IpcError::ServiceStopped)?;
        Ok(reply.await.map_err(|_| IpcError::NoReply)?)
    }

    /// For callers outside the runtime, such as the IPC listener thread.
    pub fn blocking_request(&self, command: IpcCommand) -> Result<IpcResponse> {
        let (respond, reply) = oneshot::channel();
        self.tx
            .blocking_send(Request::Command { command, respond })
            .map_err(|_| IpcError::ServiceStopped)?;
        Ok(reply.blocking_recv().map_err(|_| IpcError::NoReply)?)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(Request::Shutdown)
            .await
            .map_err(|_| IpcError::ServiceStopped)?;
        Ok(())
    }
}

/// Runs until a shutdown request arrives or every handle is dropped, then
/// fades out and removes the background.
pub async fn run<V, S>(
    mut controller: RotationController<V, S>,
    mut rx: mpsc::Receiver<Request>,
) -> Result<()>
where
    V: Vault,
    S: StyleSink,
{
    loop {
        tokio::select! {
            request = rx.recv() => match request {
                Some(Request::Command { command, respond }) => {
                    let response = dispatch(&mut controller, command);
                    if respond.send(response).is_err() {
                        log::debug!("Requester went away before the reply");
                    }
                }
                Some(Request::Shutdown) | None => break,
            },
            event = controller.next_event() => {
                if let Err(e) = controller.handle_event(event) {
                    e.log_error("Background rotation step failed");
                }
            }
        }
    }

    log::info!("Rotation service stopping");
    controller.delete_background()?;
    controller.settle().await
}

pub fn dispatch<V, S>(controller: &mut RotationController<V, S>, command: IpcCommand) -> IpcResponse
where
    V: Vault,
    S: StyleSink,
{
    match command {
        IpcCommand::SetFolder { path } => {
            let images = controller.set_folder(&path);
            success(format!("Folder set to {:?} ({} images)", path, images.len()))
        }
        IpcCommand::SetOpacity { value } => {
            if controller.set_opacity(value) {
                success(format!("Opacity set to {}", value))
            } else {
                success(format!(
                    "Opacity unchanged: {} is outside {}..={}",
                    value, MIN_OPACITY, MAX_OPACITY
                ))
            }
        }
        IpcCommand::SetFadeDuration { ms } => {
            controller.set_fade_duration(ms);
            success(format!("Fade duration set to {}ms", ms))
        }
        IpcCommand::SetRotationPeriod { ms } => {
            controller.set_rotation_period(ms);
            if ms == 0 {
                success("Automatic rotation disabled".to_string())
            } else {
                success(format!("Rotation period set to {}ms", ms))
            }
        }
        IpcCommand::SetRandom { enabled } => {
            controller.set_random(enabled);
            success(format!("Random order {}", if enabled { "on" } else { "off" }))
        }
        IpcCommand::Apply => applied(controller.apply_configured(), controller),
        IpcCommand::ApplyRandom => applied(controller.apply_random(), controller),
        IpcCommand::ApplyOrdered { index } => applied(controller.apply_ordered(index), controller),
        IpcCommand::Stop => {
            controller.stop();
            success("Rotation stopped".to_string())
        }
        IpcCommand::Delete => match controller.delete_background() {
            Ok(()) => success("Background removed".to_string()),
            Err(e) => error(e.user_friendly_message()),
        },
        IpcCommand::List => IpcResponse::Images {
            images: controller
                .refresh_list()
                .iter()
                .map(|image| image.to_string())
                .collect(),
        },
        IpcCommand::Status => IpcResponse::Status(status(controller)),
    }
}

pub fn status<V, S>(controller: &RotationController<V, S>) -> StatusReport
where
    V: Vault,
    S: StyleSink,
{
    let settings = controller.settings();
    StatusReport {
        folder: settings.folder_path.clone(),
        image_count: controller.images().len(),
        current_image: controller.fade().current().map(|image| image.to_string()),
        phase: controller.fade().phase(),
        mode: controller.mode(),
        opacity: settings.opacity,
        fade_duration_ms: settings.fade_duration_ms,
        rotation_period_ms: settings.rotation_period_ms,
        random_order: settings.random_order,
    }
}

fn applied<V, S>(outcome: Result<ApplyOutcome>, controller: &RotationController<V, S>) -> IpcResponse
where
    V: Vault,
    S: StyleSink,
{
    match outcome {
        Ok(ApplyOutcome::Applied { index, image }) => success(format!(
            "Showing {}/{}: {}",
            index + 1,
            controller.images().len(),
            image
        )),
        Ok(ApplyOutcome::NoImages) => error(format!(
            "No images found in folder {:?}",
            controller.settings().folder_path
        )),
        Err(e) => error(e.user_friendly_message()),
    }
}

fn success(message: String) -> IpcResponse {
    IpcResponse::Success { message }
}

fn error(message: String) -> IpcResponse {
    IpcResponse::Error { message }
}
