pub mod plan_io;
pub mod resources;
pub mod settings_io;
