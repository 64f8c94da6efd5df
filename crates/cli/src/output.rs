// SPDX-License-Identifier: MIT

use clap::ValueEnum;

/// Determine if color output should be enabled.
///
/// Delegates to [`crate::color::should_colorize`] — the single source of truth
/// for color detection across the CLI.
pub fn should_use_color() -> bool {
    crate::color::should_colorize()
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format a timestamp as relative time (e.g., "5s", "2m", "1h", "3d")
pub fn format_time_ago(epoch_ms: u64) -> String {
    if epoch_ms == 0 {
        return "-".to_string();
    }
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let elapsed_secs = now_ms.saturating_sub(epoch_ms) / 1000;
    if elapsed_secs < 60 {
        format!("{}s", elapsed_secs)
    } else if elapsed_secs < 3600 {
        format!("{}m", elapsed_secs / 60)
    } else if elapsed_secs < 86400 {
        format!("{}h", elapsed_secs / 3600)
    } else {
        format!("{}d", elapsed_secs / 86400)
    }
}

