pub mod card_record;
pub mod fields;
pub mod plan_record;

pub use fields::Record;
pub use plan_record::{PLAN_VERSION, apply_document, to_document};
