use bevy::prelude::*;
use std::collections::VecDeque;

use super::action::{Action, Direction};
use crate::scene::{PrimitiveFactory, SceneRegistry};

/// Default maximum number of undo entries to keep
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Linear undo/redo history of scene actions
#[derive(Debug, Clone)]
pub struct ActionLog {
    undo_stack: VecDeque<Action>,
    redo_stack: VecDeque<Action>,
    max_size: usize,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }
}

impl ActionLog {
    pub fn with_capacity(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(max_size),
            redo_stack: VecDeque::new(),
            max_size,
        }
    }

    /// Record an already-applied action. Clears the redo branch.
    pub fn push(&mut self, action: Action) {
        if action.is_no_op() {
            debug!("Ignoring no-op action: {}", action.description());
            return;
        }

        // A new action forks history; the undone branch is gone
        self.redo_stack.clear();

        if self.undo_stack.len() >= self.max_size {
            self.undo_stack.pop_front();
        }
        debug!("Recorded: {}", action.description());
        self.undo_stack.push_back(action);
    }

    /// Revert the newest action. Returns it, or `None` when there is nothing to undo.
    pub fn undo(
        &mut self,
        scene: &mut SceneRegistry,
        factory: &dyn PrimitiveFactory,
    ) -> Option<&Action> {
        let action = self.undo_stack.pop_back()?;
        action.apply(Direction::Inverse, scene, factory);
        info!("Undo: {}", action.description());
        self.redo_stack.push_back(action);
        self.redo_stack.back()
    }

    /// Re-apply the most recently undone action.
    pub fn redo(
        &mut self,
        scene: &mut SceneRegistry,
        factory: &dyn PrimitiveFactory,
    ) -> Option<&Action> {
        let action = self.redo_stack.pop_back()?;
        action.apply(Direction::Forward, scene, factory);
        info!("Redo: {}", action.description());
        self.undo_stack.push_back(action);
        self.undo_stack.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Most recent undoable action
    pub fn last(&self) -> Option<&Action> {
        self.undo_stack.back()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(Action::description)
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(Action::description)
    }

    /// Number of undoable actions
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Event to trigger undo
#[derive(Message)]
pub struct UndoEvent;

/// Event to trigger redo
#[derive(Message)]
pub struct RedoEvent;

pub struct HistoryPlugin;

impl Plugin for HistoryPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<UndoEvent>()
            .add_message::<RedoEvent>()
            .add_systems(Update, handle_undo_redo_input);
    }
}

fn handle_undo_redo_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut undo_events: MessageWriter<UndoEvent>,
    mut redo_events: MessageWriter<RedoEvent>,
) {
    let ctrl = keyboard.pressed(KeyCode::ControlLeft) || keyboard.pressed(KeyCode::ControlRight);

    if ctrl && keyboard.just_pressed(KeyCode::KeyZ) {
        if keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight) {
            redo_events.write(RedoEvent);
        } else {
            undo_events.write(UndoEvent);
        }
    }

    // Alternative: Ctrl+Y for redo
    if ctrl && keyboard.just_pressed(KeyCode::KeyY) {
        redo_events.write(RedoEvent);
    }
}
