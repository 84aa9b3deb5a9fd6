pub mod formatters;

pub use formatters::{format_file_size, format_upload_date, truncate_filename};
