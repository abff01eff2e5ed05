pub mod data_type;
pub mod file;
pub mod icon;

pub use data_type::DataType;
pub use file::{file_extension, File, DAY_FORMAT, MONTH_FORMAT, WEEK_FORMAT};
pub use icon::{icon_for_extension, DEFAULT_ICON};
