use std::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use crate::error::ErrorReporting;
use crate::fade::FadeTransition;
use crate::image_source::{ImageList, ImageRef, ImageSource, Vault};
use crate::settings::{ConfigStore, Settings};
use crate::style::StyleSink;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationMode {
    Random,
    /// `index` is the position shown last; the next tick shows `index + 1`.
    Ordered { index: usize },
}

impl std::fmt::Display for RotationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationMode::Random => write!(f, "random"),
            RotationMode::Ordered { index } => write!(f, "ordered (at {})", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { index: usize, image: ImageRef },
    /// The folder resolved to no images; nothing changed.
    NoImages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationEvent {
    Tick,
    TransitionEnd,
}

#[derive(Debug)]
struct RotationTimer {
    mode: RotationMode,
    period: Duration,
    interval: Interval,
}

impl RotationTimer {
    fn arm(mode: RotationMode, period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { mode, period, interval }
    }
}

/// Owns the image list, the rotation timer and the fade transition.
///
/// Stopped until one of the apply operations arms the timer; `stop` and
/// `delete_background` return it to stopped. There is never more than one
/// timer: arming always drops the previous one first.
pub struct RotationController<V, S> {
    source: ImageSource<V>,
    fade: FadeTransition<S>,
    store: Box<dyn ConfigStore>,
    settings: Settings,
    images: ImageList,
    timer: Option<RotationTimer>,
    rng: StdRng,
}

impl<V: Vault, S: StyleSink> RotationController<V, S> {
    pub fn new(vault: V, sink: S, store: Box<dyn ConfigStore>) -> Self {
        Self::with_rng(vault, sink, store, StdRng::from_entropy())
    }

    pub fn with_rng(vault: V, sink: S, store: Box<dyn ConfigStore>, rng: StdRng) -> Self {
        let settings = store.load().unwrap_or_else(|e| {
            log::warn!("Failed to load settings, using defaults: {}", e.user_friendly_message());
            Settings::default()
        });

        Self {
            source: ImageSource::new(vault),
            fade: FadeTransition::new(sink),
            store,
            settings,
            images: ImageList::default(),
            timer: None,
            rng,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The list as of the last refresh.
    pub fn images(&self) -> &ImageList {
        &self.images
    }

    pub fn fade(&self) -> &FadeTransition<S> {
        &self.fade
    }

    pub fn mode(&self) -> Option<RotationMode> {
        self.timer.as_ref().map(|timer| timer.mode)
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn refresh_list(&mut self) -> ImageList {
        self.images = self.source.refresh(&self.settings.folder_path);
        self.images.clone()
    }

    /// Show a random image and, with a period set, keep picking one on
    /// every tick.
    pub fn apply_random(&mut self) -> Result<ApplyOutcome> {
        let images = self.refresh_list();
        if images.is_empty() {
            log::warn!("No images available in {:?}", self.settings.folder_path);
            return Ok(ApplyOutcome::NoImages);
        }

        // Cancel before showing so a failed apply leaves rotation stopped.
        self.timer = None;
        let index = self.rng.gen_range(0..images.len());
        let outcome = self.show(&images, index)?;
        self.arm(RotationMode::Random);
        Ok(outcome)
    }

    /// Show `start % len` and, with a period set, advance by one per tick.
    pub fn apply_ordered(&mut self, start: usize) -> Result<ApplyOutcome> {
        let images = self.refresh_list();
        if images.is_empty() {
            log::warn!("No images available in {:?}", self.settings.folder_path);
            return Ok(ApplyOutcome::NoImages);
        }

        self.timer = None;
        let index = start % images.len();
        let outcome = self.show(&images, index)?;
        self.arm(RotationMode::Ordered { index });
        Ok(outcome)
    }

    /// Random or ordered from the first image, per the saved flag.
    pub fn apply_configured(&mut self) -> Result<ApplyOutcome> {
        if self.settings.random_order {
            self.apply_random()
        } else {
            self.apply_ordered(0)
        }
    }

    /// Cancel automatic rotation. The current background stays.
    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            log::info!("Background rotation stopped");
        }
    }

    pub fn delete_background(&mut self) -> Result<()> {
        self.stop();
        self.fade.delete()
    }

    pub fn set_folder(&mut self, path: &str) -> ImageList {
        self.settings.folder_path = path.to_string();
        self.persist();
        self.refresh_list()
    }

    /// Applied live to the visible background. Out-of-range values are
    /// ignored and `false` is returned.
    pub fn set_opacity(&mut self, value: f32) -> bool {
        if let Err(e) = self.settings.set_opacity(value) {
            log::warn!("Ignoring opacity change: {}", e);
            return false;
        }
        self.persist();
        if let Err(e) = self.fade.set_opacity(value) {
            e.log_error("Failed to update background opacity");
        }
        true
    }

    /// Used from the next apply on.
    pub fn set_fade_duration(&mut self, ms: u64) {
        self.settings.fade_duration_ms = ms;
        self.persist();
    }

    /// Picked up by the running timer on its next tick.
    pub fn set_rotation_period(&mut self, ms: u64) {
        self.settings.rotation_period_ms = ms;
        self.persist();
    }

    pub fn set_random(&mut self, enabled: bool) {
        self.settings.random_order = enabled;
        self.persist();
    }

    /// Waits for the next timer tick or fade completion.
    pub async fn next_event(&mut self) -> RotationEvent {
        tokio::select! {
            () = self.fade.transition_end() => RotationEvent::TransitionEnd,
            () = next_tick(&mut self.timer) => RotationEvent::Tick,
        }
    }

    pub fn handle_event(&mut self, event: RotationEvent) -> Result<()> {
        match event {
            RotationEvent::Tick => self.on_tick(),
            RotationEvent::TransitionEnd => self.fade.on_transition_end(),
        }
    }

    /// Run queued fades to completion.
    pub async fn settle(&mut self) -> Result<()> {
        while self.fade.is_busy() {
            self.fade.transition_end().await;
            self.fade.on_transition_end()?;
        }
        Ok(())
    }

    fn on_tick(&mut self) -> Result<()> {
        let Some(mode) = self.mode() else {
            return Ok(());
        };

        let images = self.refresh_list();
        let result = if images.is_empty() {
            log::warn!("No images available in {:?}, skipping rotation", self.settings.folder_path);
            Ok(())
        } else {
            let index = match mode {
                RotationMode::Random => self.rng.gen_range(0..images.len()),
                RotationMode::Ordered { index } => (index + 1) % images.len(),
            };
            if let (Some(timer), RotationMode::Ordered { .. }) = (self.timer.as_mut(), mode) {
                timer.mode = RotationMode::Ordered { index };
            }
            self.show(&images, index).map(|_| ())
        };

        self.recheck_period();
        result
    }

    fn recheck_period(&mut self) {
        let Some((mode, period)) = self.timer.as_ref().map(|timer| (timer.mode, timer.period)) else {
            return;
        };

        match self.settings.rotation_period() {
            None => {
                log::info!("Rotation period is 0, automatic rotation disabled");
                self.timer = None;
            }
            Some(new_period) if new_period != period => {
                log::info!("Rotation period changed to {:?}", new_period);
                self.timer = Some(RotationTimer::arm(mode, new_period));
            }
            Some(_) => {}
        }
    }

    fn show(&mut self, images: &ImageList, index: usize) -> Result<ApplyOutcome> {
        let Some(image) = images.get(index).cloned() else {
            return Ok(ApplyOutcome::NoImages);
        };

        self.fade.apply(image.clone(), self.settings.opacity, self.settings.fade_duration())?;
        log::info!("Background {}/{}: {}", index + 1, images.len(), image);
        Ok(ApplyOutcome::Applied { index, image })
    }

    fn arm(&mut self, mode: RotationMode) {
        // At most one live timer.
        self.timer = None;
        if let Some(period) = self.settings.rotation_period() {
            log::info!("Rotating backgrounds ({}) every {:?}", mode, period);
            self.timer = Some(RotationTimer::arm(mode, period));
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.settings) {
            e.log_error("Failed to save settings");
        }
    }
}

async fn next_tick(timer: &mut Option<RotationTimer>) {
    match timer {
        Some(timer) => {
            timer.interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
