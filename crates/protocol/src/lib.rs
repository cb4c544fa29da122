pub mod method_id;
pub mod types;

pub use method_id::MethodId;
pub use types::{ClockType, FilterType, Summary, TimeRange};
