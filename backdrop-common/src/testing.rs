//! Test doubles for the external collaborators.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use crate::error::StyleError;
use crate::image_source::ImageRef;
use crate::settings::{ConfigStore, Settings};
use crate::style::{StyleRule, StyleSink, TransitionEnd, TransitionSignal};
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum SinkOp {
    Create(StyleRule),
    Rule(StyleRule),
    Background(Option<ImageRef>),
    Active(bool),
    Remove,
}

#[derive(Default)]
struct SinkLog {
    ops: Vec<SinkOp>,
    signals: Vec<TransitionSignal>,
}

/// Records every call. `auto` sinks end fades immediately; `manual` sinks
/// hold them until [`finish_transition`](RecordingSink::finish_transition).
#[derive(Clone)]
pub struct RecordingSink {
    log: Rc<RefCell<SinkLog>>,
    auto_complete: bool,
    failing: Rc<Cell<bool>>,
}

impl RecordingSink {
    pub fn auto() -> Self {
        Self {
            log: Rc::default(),
            auto_complete: true,
            failing: Rc::default(),
        }
    }

    pub fn manual() -> Self {
        Self {
            log: Rc::default(),
            auto_complete: false,
            failing: Rc::default(),
        }
    }

    pub fn ops(&self) -> Vec<SinkOp> {
        self.log.borrow().ops.clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().ops.clear();
    }

    pub fn backgrounds(&self) -> Vec<Option<ImageRef>> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                SinkOp::Background(image) => Some(image),
                _ => None,
            })
            .collect()
    }

    /// Last image put on the resource, if it still exists.
    pub fn shown(&self) -> Option<ImageRef> {
        self.backgrounds().into_iter().last().flatten()
    }

    /// While set, every call fails without being recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    fn check(&self) -> Result<()> {
        if self.failing.get() {
            return Err(StyleError::NoResource.into());
        }
        Ok(())
    }

    pub fn finish_transition(&self) {
        let signal = self.log.borrow_mut().signals.pop();
        if let Some(signal) = signal {
            signal.complete();
        }
    }
}

impl StyleSink for RecordingSink {
    fn create(&mut self, rule: StyleRule) -> Result<()> {
        self.check()?;
        self.log.borrow_mut().ops.push(SinkOp::Create(rule));
        Ok(())
    }

    fn update_rule(&mut self, rule: StyleRule) -> Result<()> {
        self.check()?;
        self.log.borrow_mut().ops.push(SinkOp::Rule(rule));
        Ok(())
    }

    fn set_background(&mut self, image: Option<&ImageRef>) -> Result<()> {
        self.check()?;
        self.log.borrow_mut().ops.push(SinkOp::Background(image.cloned()));
        Ok(())
    }

    fn set_active(&mut self, active: bool) -> Result<TransitionEnd> {
        self.check()?;
        let mut log = self.log.borrow_mut();
        log.ops.push(SinkOp::Active(active));
        if self.auto_complete {
            return Ok(TransitionEnd::completed());
        }
        let (signal, end) = TransitionEnd::channel();
        log.signals.push(signal);
        Ok(end)
    }

    fn remove(&mut self) -> Result<()> {
        self.check()?;
        self.log.borrow_mut().ops.push(SinkOp::Remove);
        Ok(())
    }
}

/// Settings kept in memory; counts saves.
#[derive(Clone, Default)]
pub struct MemoryStore {
    settings: Rc<RefCell<Settings>>,
    saves: Rc<RefCell<usize>>,
}

impl MemoryStore {
    pub fn with(settings: Settings) -> Self {
        Self {
            settings: Rc::new(RefCell::new(settings)),
            saves: Rc::default(),
        }
    }

    pub fn saved(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Settings> {
        Ok(self.settings.borrow().clone())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.settings.borrow_mut() = settings.clone();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}
