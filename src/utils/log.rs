// src/utils/log.rs

//! Formatting helpers for batch job output.
//!
//! Everything goes through the `log` facade, so the CLI's env_logger setup
//! decides timestamps, levels and filtering.

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log a separator line
pub fn separator() {
    log::info!("{}", "─".repeat(60));
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    for line in summary_lines(title, items) {
        log::info!("{}", line);
    }
}

fn summary_lines(title: &str, items: &[(&str, String)]) -> Vec<String> {
    let width = items.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    std::iter::once(format!("[SUMMARY] {}", title))
        .chain(
            items
                .iter()
                .map(|(key, value)| format!("    {:<width$} : {}", key, value)),
        )
        .collect()
}
