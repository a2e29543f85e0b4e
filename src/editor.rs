//! Keyboard-driven live editing of one instance set.
//!
//! The editor keeps a selected index and turns key presses into transform
//! edits on that instance. Every edit goes through
//! [`BestEffort`](crate::data_structures::instance::BestEffort): a stale
//! selection logs a warning and changes nothing.

use cgmath::{Matrix4, SquareMatrix, Vector3};
use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
};

use crate::data_structures::instance::{BestEffort, InstanceSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditAction {
    SelectNext,
    SelectPrevious,
    Translate(Vector3<f32>),
    /// Relative Euler rotation in degrees.
    Rotate(Vector3<f32>),
    Scale(f32),
    Add,
    Remove,
}

#[derive(Debug, Clone)]
pub struct TransformEditor {
    selected: usize,
    /// World units per arrow key press.
    pub step: f32,
    /// Degrees per rotate key press.
    pub angle_step: f32,
    modifiers: ModifiersState,
}

impl Default for TransformEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformEditor {
    pub fn new() -> Self {
        Self {
            selected: 0,
            step: 0.25,
            angle_step: 15.0,
            modifiers: ModifiersState::empty(),
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select(&mut self, index: usize) {
        self.selected = index;
    }

    pub fn action_for(&self, key: KeyCode, shift: bool) -> Option<EditAction> {
        let step = self.step;
        let action = match key {
            KeyCode::Tab if shift => EditAction::SelectPrevious,
            KeyCode::Tab => EditAction::SelectNext,
            KeyCode::ArrowLeft => EditAction::Translate(Vector3::new(-step, 0.0, 0.0)),
            KeyCode::ArrowRight => EditAction::Translate(Vector3::new(step, 0.0, 0.0)),
            KeyCode::ArrowUp => EditAction::Translate(Vector3::new(0.0, 0.0, -step)),
            KeyCode::ArrowDown => EditAction::Translate(Vector3::new(0.0, 0.0, step)),
            KeyCode::PageUp => EditAction::Translate(Vector3::new(0.0, step, 0.0)),
            KeyCode::PageDown => EditAction::Translate(Vector3::new(0.0, -step, 0.0)),
            KeyCode::KeyR => EditAction::Rotate(Vector3::new(0.0, self.angle_step, 0.0)),
            KeyCode::Equal => EditAction::Scale(1.1),
            KeyCode::Minus => EditAction::Scale(0.9),
            KeyCode::Insert => EditAction::Add,
            KeyCode::Delete => EditAction::Remove,
            _ => return None,
        };
        Some(action)
    }

    /// Apply `action` to the selected instance of `set`.
    pub fn apply<B>(&mut self, set: &mut InstanceSet<B>, action: EditAction) {
        let len = set.instance_count();
        match action {
            EditAction::SelectNext if len > 0 => self.selected = (self.selected + 1) % len,
            EditAction::SelectPrevious if len > 0 => {
                self.selected = (self.selected.min(len - 1) + len - 1) % len
            }
            EditAction::SelectNext | EditAction::SelectPrevious => self.selected = 0,
            EditAction::Translate(delta) => {
                if let Some(position) = set.position(self.selected).best_effort() {
                    set.set_position(self.selected, position + delta)
                        .best_effort();
                }
            }
            EditAction::Rotate(euler) => {
                set.rotate(self.selected, euler).best_effort();
            }
            EditAction::Scale(factor) => {
                set.scale_by(self.selected, Vector3::new(factor, factor, factor))
                    .best_effort();
            }
            EditAction::Add => {
                self.selected = set.add_instance(Matrix4::identity());
            }
            EditAction::Remove => {
                if set.remove_instance(self.selected).best_effort().is_some() {
                    self.selected = self.selected.min(set.instance_count().saturating_sub(1));
                }
            }
        }
        log::debug!("{:?} -> instance {}", action, self.selected);
    }

    /// Track modifiers and apply key presses. Returns true if an edit was applied.
    pub fn handle_window_events<B>(&mut self, set: &mut InstanceSet<B>, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
                false
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match self.action_for(*key, self.modifiers.shift_key()) {
                Some(action) => {
                    self.apply(set, action);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}
