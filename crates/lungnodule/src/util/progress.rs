use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress over a batch of reports, drawn on stderr so stdout stays clean.
pub fn create_progress_bar(total: u64, message: &str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} reports ({per_sec}, eta {eta})")
            .expect("Failed to create progress template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}
