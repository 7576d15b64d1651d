//! Interfaces of the surfaces the core drives but does not own.

use crate::config::Mode;
use crate::pulse::{DeviceId, Pulse};

pub trait RenderTarget {
    /// Marks the canvas dirty. Repeated calls before the next frame are free.
    fn request_redraw(&mut self);
}

/// What a module action sees besides the pulse.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    /// Name of the action being invoked.
    pub call: &'a str,
    pub section: usize,
    pub mode: Mode,
    pub bind: &'a DeviceId,
    pub command: &'a str,
}

pub trait Module {
    fn name(&self) -> &str;

    /// Detent count this module wants while focused.
    fn positions(&self) -> Option<usize> {
        None
    }

    fn process_key(&mut self, ctx: &EventContext<'_>, pulse: &Pulse) -> anyhow::Result<()>;
}

pub trait WheelUi {
    fn current_selection(&self) -> usize;
    fn set_selection(&mut self, index: usize);
    fn open(&mut self);
    fn select(&mut self);
    fn quick_switch(&mut self, pulse: &Pulse);
    fn is_sections_animating(&self) -> bool;
    fn section_count(&self) -> usize;
    fn module_mut(&mut self, section: usize) -> Option<&mut dyn Module>;
}
