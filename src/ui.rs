use colored::Colorize;
use console::{Alignment, measure_text_width, pad_str};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(measure_text_width(title)).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Size Formatting
// ============================================================================

const MB: u64 = 1024 * 1024;
const GB: u64 = MB * 1024;

/// Format a byte count the way fleet configs write sizes ("8GB", "512MB")
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.0}GB", bytes as f64 / GB as f64)
    } else {
        format!("{:.0}MB", bytes as f64 / MB as f64)
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Color a VM state for display
pub fn colorize_state(state: &str) -> String {
    match state.to_ascii_lowercase().as_str() {
        "running" => state.green().to_string(),
        "stopped" => state.yellow().to_string(),
        _ => state.dimmed().to_string(),
    }
}

/// Render rows as a left-aligned table with a bold header row.
///
/// Cells may contain ANSI colors; widths are measured without them.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| measure_text_width(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(measure_text_width(cell));
        }
    }

    let render = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad_str(cell, *width, Alignment::Left, None).into_owned())
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.bold().to_string()).collect();
    out.push_str("  ");
    out.push_str(&render(&header_cells));
    out.push('\n');
    out.push_str("  ");
    out.push_str(
        &widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
            .dimmed()
            .to_string(),
    );

    for row in rows {
        out.push('\n');
        out.push_str("  ");
        out.push_str(&render(row));
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_gb() {
        assert_eq!(format_bytes(8 * GB), "8GB");
        assert_eq!(format_bytes(GB), "1GB");
    }

    #[test]
    fn test_format_bytes_mb() {
        assert_eq!(format_bytes(512 * MB), "512MB");
        assert_eq!(format_bytes(0), "0MB");
    }

    #[test]
    fn test_table_aligns_columns() {
        colored::control::set_override(false);
        let rows = vec![
            vec!["dev".to_string(), "running".to_string()],
            vec!["ci-linux".to_string(), "-".to_string()],
        ];
        let out = table(&["NAME", "STATE"], &rows);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "  NAME      STATE");
        assert_eq!(lines[2], "  dev       running");
        assert_eq!(lines[3], "  ci-linux  -");
    }

    #[test]
    fn test_colorize_state_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(colorize_state("Running"), "Running");
        assert_eq!(colorize_state("not created"), "not created");
    }
}
