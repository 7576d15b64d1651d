//! Log-only collaborators for running the daemon without a display.

use crate::chooser::{Chooser, Section};
use crate::collab::{EventContext, Module, RenderTarget};
use crate::config::Config;
use crate::pulse::Pulse;

#[derive(Debug, Default)]
pub struct LogRender {
    redraws: u64,
}

impl LogRender {
    pub fn redraws(&self) -> u64 {
        self.redraws
    }
}

impl RenderTarget for LogRender {
    fn request_redraw(&mut self) {
        self.redraws += 1;
        log::trace!("redraw #{}", self.redraws);
    }
}

#[derive(Debug)]
pub struct LogModule {
    name: String,
    positions: Option<usize>,
}

impl LogModule {
    pub fn new(name: impl Into<String>, positions: Option<usize>) -> Self {
        Self {
            name: name.into(),
            positions,
        }
    }
}

impl Module for LogModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn positions(&self) -> Option<usize> {
        self.positions
    }

    fn process_key(&mut self, ctx: &EventContext<'_>, pulse: &Pulse) -> anyhow::Result<()> {
        log::info!(
            "[{}] {} <- {}.{} (target {:.1}{})",
            self.name,
            ctx.call,
            ctx.bind,
            ctx.command,
            pulse.target,
            if pulse.click { ", detent" } else { "" }
        );
        Ok(())
    }
}

/// One logging module per configured section.
pub fn chooser(config: &Config) -> Chooser {
    Chooser::new(
        config
            .sections
            .iter()
            .map(|s| Section::new(&s.name, Box::new(LogModule::new(&s.name, s.positions))))
            .collect(),
    )
}
