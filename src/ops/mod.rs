pub mod board_ops;
pub mod layout;
pub mod numbering;
pub mod project_ops;
pub mod search;
