//! The capability through which the single background style resource is
//! created, mutated and removed.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use crate::image_source::ImageRef;
use crate::Result;

/// Transition rule carried by the style resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleRule {
    /// Duration of every opacity transition.
    pub duration: Duration,
    /// Opacity while the resource is active.
    pub opacity: f32,
}

/// Resolves once the fade started by [`StyleSink::set_active`] has ended.
///
/// A sink that drops its [`TransitionSignal`] without completing it also
/// resolves the future, so a vanished sink can never stall a rotation.
#[derive(Debug)]
pub struct TransitionEnd(oneshot::Receiver<()>);

/// Sink-side half of a [`TransitionEnd`].
#[derive(Debug)]
pub struct TransitionSignal(oneshot::Sender<()>);

impl TransitionEnd {
    pub fn channel() -> (TransitionSignal, TransitionEnd) {
        let (tx, rx) = oneshot::channel();
        (TransitionSignal(tx), TransitionEnd(rx))
    }

    /// A transition that has already ended, for zero-length fades.
    pub fn completed() -> Self {
        let (signal, end) = Self::channel();
        signal.complete();
        end
    }
}

impl TransitionSignal {
    pub fn complete(self) {
        let _ = self.0.send(());
    }
}

impl Future for TransitionEnd {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.0).poll(cx).map(|_| ())
    }
}

/// The visual resource that shows the page background.
///
/// There is exactly one resource behind a sink. It is created by
/// [`create`](StyleSink::create) and destroyed by
/// [`remove`](StyleSink::remove); the other calls act on it in between.
pub trait StyleSink {
    /// Create the resource, inactive (opacity 0) and without an image.
    fn create(&mut self, rule: StyleRule) -> Result<()>;

    /// Replace the transition rule in place. Takes effect immediately and
    /// does not start a transition of its own.
    fn update_rule(&mut self, rule: StyleRule) -> Result<()>;

    fn set_background(&mut self, image: Option<&ImageRef>) -> Result<()>;

    /// Fade in (`true`) or out (`false`) using the rule's duration.
    fn set_active(&mut self, active: bool) -> Result<TransitionEnd>;

    fn remove(&mut self) -> Result<()>;
}
