use crate::block::ProgressBlock;
use crate::theme::Theme;

pub const BAR_WIDTH: usize = 40;

/// Style name for a progress status.
pub fn status_style(status: Option<&str>) -> &'static str {
    match status {
        Some("complete" | "completed" | "success") => "status_success",
        Some("error" | "failed") => "status_error",
        Some("paused" | "warning") => "status_warning",
        _ => "status_info",
    }
}

pub fn render_progress(progress: &ProgressBlock, theme: &Theme) -> String {
    let value = if progress.value.is_finite() {
        progress.value.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((value / 100.0) * BAR_WIDTH as f64).round() as usize;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
    let bar = theme.apply(status_style(progress.status.as_deref()), &bar);

    let mut line = String::new();
    if let Some(label) = &progress.label {
        line.push_str(label);
        line.push(' ');
    }
    line.push_str(&format!("{bar} {value:.0}%"));
    if let Some(status) = &progress.status {
        line.push_str(&format!(" ({status})"));
    }
    line
}
