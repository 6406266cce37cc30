use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Returns a hidden bar; it draws once added to a [`MultiProgress`].
pub fn bar(header: String, length: u64) -> ProgressBar {
    let pb = ProgressBar::hidden();
    pb.set_prefix(header);
    pb.set_length(length);
    pb.set_style(
        ProgressStyle::with_template("{prefix}...\n[{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
            .expect("incorrect progress bar format string")
            .progress_chars("#>-"),
    );
    pb
}

pub fn group() -> MultiProgress {
    MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(4))
}
