mod activity_type;
mod category;
pub mod timestamp;
mod workout;

pub use activity_type::ActivityType;
pub use category::{Category, Subcategory};
pub use workout::WorkoutRecord;
