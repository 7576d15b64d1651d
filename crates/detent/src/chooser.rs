//! Headless section chooser: the wheel UI without any drawing.

use crate::collab::{Module, WheelUi};
use crate::pulse::Pulse;

pub struct Section {
    pub name: String,
    pub module: Box<dyn Module>,
}

impl Section {
    pub fn new(name: impl Into<String>, module: Box<dyn Module>) -> Self {
        Self {
            name: name.into(),
            module,
        }
    }
}

pub struct Chooser {
    sections: Vec<Section>,
    selection: usize,
    previous: usize,
    visible: bool,
    focused: Option<usize>,
}

impl Chooser {
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            sections,
            selection: 0,
            previous: 0,
            visible: true,
            focused: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Section whose module has focus, if any.
    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.sections.get(self.selection).map(|s| s.name.as_str())
    }
}

impl WheelUi for Chooser {
    fn current_selection(&self) -> usize {
        self.selection
    }

    fn set_selection(&mut self, index: usize) {
        if index >= self.sections.len() || index == self.selection {
            return;
        }
        self.previous = self.selection;
        self.selection = index;
        log::debug!("Selected section '{}'", self.sections[index].name);
    }

    fn open(&mut self) {
        self.visible = true;
        self.focused = None;
    }

    fn select(&mut self) {
        if self.sections.is_empty() {
            return;
        }
        self.visible = false;
        self.focused = Some(self.selection);
    }

    fn quick_switch(&mut self, pulse: &Pulse) {
        // rotaries switch once per detent, not on every coasting tick
        if pulse.is_virtual && !pulse.click {
            return;
        }
        self.set_selection(self.previous);
        if self.focused.is_some() {
            self.focused = Some(self.selection);
        }
    }

    fn is_sections_animating(&self) -> bool {
        false
    }

    fn section_count(&self) -> usize {
        self.sections.len()
    }

    fn module_mut(&mut self, section: usize) -> Option<&mut dyn Module> {
        self.sections
            .get_mut(section)
            .map(|s| s.module.as_mut() as &mut dyn Module)
    }
}
