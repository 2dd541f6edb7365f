mod action;
mod history;
mod transform;

pub use action::*;
pub use history::*;
pub use transform::*;

use bevy::prelude::*;

pub struct CommandsPlugin;

impl Plugin for CommandsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(HistoryPlugin);
    }
}
