pub mod board;
pub mod camera;
pub mod card;
pub mod event_log;
pub mod geometry;
pub mod ids;
pub mod project;
pub mod selection;
pub mod settings;

pub use board::*;
pub use camera::*;
pub use card::*;
pub use event_log::*;
pub use geometry::*;
pub use ids::*;
pub use project::*;
pub use selection::*;
pub use settings::*;
