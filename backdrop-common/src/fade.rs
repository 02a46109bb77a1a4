use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::image_source::ImageRef;
use crate::style::{StyleRule, StyleSink, TransitionEnd};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    FadingOut,
    Swapping,
    FadingIn,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::FadingOut => write!(f, "fading out"),
            Phase::Swapping => write!(f, "swapping"),
            Phase::FadingIn => write!(f, "fading in"),
        }
    }
}

/// What the single visible background is doing. Exists from the first
/// apply until the background is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionState {
    pub current: Option<ImageRef>,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Request {
    Show(ImageRef),
    Remove,
}

/// Runs fade-out, swap, fade-in sequences on the style resource.
///
/// At most one fade is in flight. Requests arriving while one is running
/// are coalesced into a single pending request, newest wins:
/// - during a fade-out the pending request is what happens when it lands,
///   so a newer image (or a delete) replaces the older target;
/// - during a fade-in it is started once the fade-in completes.
pub struct FadeTransition<S> {
    sink: S,
    state: Option<TransitionState>,
    rule: StyleRule,
    active: bool,
    in_flight: Option<TransitionEnd>,
    pending: Option<Request>,
}

impl<S: StyleSink> FadeTransition<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: None,
            rule: StyleRule {
                duration: Duration::ZERO,
                opacity: 1.0,
            },
            active: false,
            in_flight: None,
            pending: None,
        }
    }

    pub fn state(&self) -> Option<&TransitionState> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.state.as_ref().map_or(Phase::Idle, |state| state.phase)
    }

    pub fn current(&self) -> Option<&ImageRef> {
        self.state.as_ref().and_then(|state| state.current.as_ref())
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Show `image`, fading out whatever is visible first.
    pub fn apply(&mut self, image: ImageRef, opacity: f32, duration: Duration) -> Result<()> {
        let rule = StyleRule { duration, opacity };

        if self.state.is_none() {
            // Cold start: nothing visible, so no fade-out.
            self.sink.create(rule)?;
            self.rule = rule;
            self.active = false;
            self.sink.set_background(Some(&image))?;
            self.state = Some(TransitionState {
                current: Some(image),
                phase: Phase::Idle,
            });
            log::info!("Created background style resource");
            return self.fade_in();
        }

        if self.rule != rule {
            self.sink.update_rule(rule)?;
            self.rule = rule;
        }
        self.request(Request::Show(image))
    }

    /// Fade out and remove the resource. No-op when nothing exists.
    pub fn delete(&mut self) -> Result<()> {
        if self.state.is_none() {
            log::debug!("No background to delete");
            return Ok(());
        }
        self.request(Request::Remove)
    }

    /// Live opacity change: no fade cycle, the current image stays.
    pub fn set_opacity(&mut self, opacity: f32) -> Result<()> {
        if self.rule.opacity == opacity {
            return Ok(());
        }
        let rule = StyleRule { opacity, ..self.rule };
        if self.state.is_some() {
            self.sink.update_rule(rule)?;
        }
        self.rule = rule;
        Ok(())
    }

    /// Resolves when the in-flight fade ends; pending forever when idle.
    /// Follow up with [`on_transition_end`](Self::on_transition_end).
    pub async fn transition_end(&mut self) {
        match self.in_flight.as_mut() {
            Some(end) => {
                end.await;
                self.in_flight = None;
            }
            None => std::future::pending().await,
        }
    }

    /// Advance the sequence after a fade has ended.
    pub fn on_transition_end(&mut self) -> Result<()> {
        self.in_flight = None;
        match self.phase() {
            Phase::FadingOut => match self.pending.take() {
                Some(Request::Show(image)) => {
                    self.set_phase(Phase::Swapping);
                    self.sink.set_background(Some(&image))?;
                    if let Some(state) = self.state.as_mut() {
                        state.current = Some(image);
                    }
                    self.fade_in()
                }
                Some(Request::Remove) => self.remove_resource(),
                // Faded out with nothing to show: keep the resource, inactive.
                None => {
                    self.set_phase(Phase::Idle);
                    Ok(())
                }
            },
            Phase::FadingIn => {
                self.set_phase(Phase::Idle);
                log::debug!("Fade-in finished");
                match self.pending.take() {
                    Some(request) => self.request(request),
                    None => Ok(()),
                }
            }
            Phase::Idle | Phase::Swapping => Ok(()),
        }
    }

    fn request(&mut self, request: Request) -> Result<()> {
        if self.is_busy() {
            log::debug!("Transition in flight ({}), queueing {:?}", self.phase(), request);
            self.pending = Some(request);
            return Ok(());
        }

        match request {
            Request::Show(image) if self.active => {
                self.fade_out()?;
                self.pending = Some(Request::Show(image));
                Ok(())
            }
            Request::Show(image) => {
                self.set_phase(Phase::Swapping);
                self.sink.set_background(Some(&image))?;
                if let Some(state) = self.state.as_mut() {
                    state.current = Some(image);
                }
                self.fade_in()
            }
            Request::Remove if self.active => {
                self.fade_out()?;
                self.pending = Some(Request::Remove);
                Ok(())
            }
            Request::Remove => self.remove_resource(),
        }
    }

    fn fade_in(&mut self) -> Result<()> {
        let end = self.sink.set_active(true)?;
        self.active = true;
        self.in_flight = Some(end);
        self.set_phase(Phase::FadingIn);
        if let Some(image) = self.current() {
            log::info!("Fading in background {}", image);
        }
        Ok(())
    }

    fn fade_out(&mut self) -> Result<()> {
        let end = self.sink.set_active(false)?;
        self.active = false;
        self.in_flight = Some(end);
        self.set_phase(Phase::FadingOut);
        log::debug!("Fading out current background");
        Ok(())
    }

    fn remove_resource(&mut self) -> Result<()> {
        self.sink.set_background(None)?;
        self.sink.remove()?;
        self.state = None;
        self.active = false;
        self.pending = None;
        log::info!("Removed background style resource");
        Ok(())
    }

    fn set_phase(&mut self, phase: Phase) {
        if let Some(state) = self.state.as_mut() {
            state.phase = phase;
        }
    }
}
