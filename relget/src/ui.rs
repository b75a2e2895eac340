use colored::*;

pub fn success(msg: &str) {
    tracing::info!("{} {}", "✓".green(), msg.green());
}

pub fn error(msg: &str) {
    tracing::error!("{} {}", "Error:".red(), msg.red());
}

pub fn info(msg: &str) {
    tracing::info!("{}", msg);
}

pub fn warning(msg: &str) {
    tracing::warn!("{}", msg.yellow());
}

pub fn tip(msg: &str) {
    tracing::info!("{} {}", "Tip:".dimmed(), msg.dimmed());
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
