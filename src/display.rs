use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

use crate::api::{DescriptionResult, PictureApi};
use crate::error::ClientError;
use crate::picture::SelectedPicture;
use crate::workflow::Session;

/// One label of a description, as printed with `--json`
#[derive(Debug, Serialize, PartialEq)]
pub struct LabelScore<'a> {
    pub label: &'a str,
    pub score: f64,
}

/// Render a description as `label (score)` lines, in order
pub fn render_description(result: &DescriptionResult) -> Vec<String> {
    result
        .pairs()
        .map(|(label, score)| format!("{} ({})", label, score))
        .collect()
}

pub fn label_scores(result: &DescriptionResult) -> Vec<LabelScore<'_>> {
    result
        .pairs()
        .map(|(label, score)| LabelScore { label, score })
        .collect()
}

/// Format file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// One-line stand-in for the picture preview
pub fn preview_line(picture: &SelectedPicture) -> String {
    format!(
        "🖼  {} ({}, {})",
        picture.name(),
        picture.media_type(),
        format_size(picture.size())
    )
}

/// Spinner shown while remote calls are in flight
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Notification for a failed action
pub fn toast_error(message: &str) {
    eprintln!("{} {}", style("✗").red(), style(message).red().bold());
}

/// Error attached to a single form field
pub fn field_error(message: &str) {
    eprintln!("  {}", style(message).yellow());
}

pub fn success(message: &str) {
    println!("{} {}", style("✓").green(), style(message).green().bold());
}

/// Print the inline field errors a failed submission left, then its toast
pub fn report_failure<A: PictureApi>(session: &Session<A>, err: &ClientError) {
    if err.is_form_error() {
        if let Some(message) = session.file_error() {
            field_error(message);
        }
        if let Some(message) = session.caption_error() {
            field_error(message);
        }
    }
    toast_error(&err.user_message());
    if let Some(refetch) = session.authorization_error() {
        toast_error(&refetch.user_message());
    }
}
