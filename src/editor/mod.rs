mod camera;
mod input;
mod plugin;
mod session;
mod state;

pub use camera::*;
pub use input::*;
pub use plugin::*;
pub use session::*;
pub use state::*;
