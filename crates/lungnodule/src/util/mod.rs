pub mod format;
pub mod progress;

pub use format::format_duration;
pub use progress::create_progress_bar;
