//! Terminal styling for the importer's human-facing output.

use crate::import::{FileOutcome, RunReport, RunStatus};
use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color as CtColor, Stylize};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

fn ansi(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(ansi(AnsiColor::Yellow).bold().underline())
        .header(ansi(AnsiColor::Yellow).bold().underline())
        .literal(ansi(AnsiColor::Green).bold())
        .invalid(ansi(AnsiColor::Red).bold())
        .error(ansi(AnsiColor::Red).bold())
        .placeholder(ansi(AnsiColor::BrightBlack))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Color Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color::Rgb { r, g, b }
    }

    /// The dataset's own yellow.
    pub const ACCENT: Color = rgb(245, 197, 24);
    pub const OK: Color = rgb(80, 220, 120);
    pub const WARN: Color = rgb(255, 170, 40);
    pub const FAIL: Color = rgb(240, 90, 90);
    pub const NOTE: Color = rgb(110, 160, 230);
    pub const MUTED: Color = rgb(135, 135, 135);
    pub const PLAIN: Color = rgb(235, 235, 235);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Box Drawing Characters
// ═══════════════════════════════════════════════════════════════════════════════

pub mod box_chars {
    pub const H: &str = "─";
    pub const V: &str = "│";

    pub const TOP_LEFT: &str = "╭";
    pub const TOP_RIGHT: &str = "╮";
    pub const BOTTOM_LEFT: &str = "╰";
    pub const BOTTOM_RIGHT: &str = "╯";

    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";

    pub const DOT: &str = "●";
    pub const DOT_EMPTY: &str = "○";
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status Lines
// ═══════════════════════════════════════════════════════════════════════════════

fn print_marked(mark: &str, color: CtColor, message: &str) {
    println!(" {} {}", mark.with(color).bold(), message.with(color));
}

pub fn print_success(message: &str) {
    print_marked("✓", colors::OK, message);
}

pub fn print_error(message: &str) {
    print_marked("✗", colors::FAIL, message);
}

pub fn print_warning(message: &str) {
    print_marked("⚠", colors::WARN, message);
}

pub fn print_info(message: &str) {
    print_marked("ℹ", colors::NOTE, message);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Section Headers
// ═══════════════════════════════════════════════════════════════════════════════

const SECTION_WIDTH: usize = 60;

pub fn print_section_header(title: &str) {
    let inner = title.width() + 2;
    let left = SECTION_WIDTH.saturating_sub(inner + 2) / 2;
    let right = SECTION_WIDTH.saturating_sub(inner + 2 + left);

    println!();
    println!(
        "{}{} {} {}{}",
        box_chars::TOP_LEFT.with(colors::ACCENT),
        box_chars::H.repeat(left).with(colors::ACCENT),
        title.with(colors::ACCENT).bold().attribute(Attribute::Italic),
        box_chars::H.repeat(right).with(colors::ACCENT),
        box_chars::TOP_RIGHT.with(colors::ACCENT),
    );
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::DOT.with(colors::ACCENT),
        format!("{}:", key).with(colors::MUTED),
        value.with(colors::PLAIN)
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        box_chars::DOT_EMPTY.with(colors::MUTED),
        message.with(colors::MUTED).attribute(Attribute::Italic)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Table Display
// ═══════════════════════════════════════════════════════════════════════════════

/// A boxed table sized to its widest cell per column.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<(String, CtColor)>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: Vec<&str>) -> Self {
        Self {
            col_widths: headers.iter().map(|h| h.width()).collect(),
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.add_colored_row(row.into_iter().map(|cell| (cell, colors::PLAIN)).collect());
    }

    pub fn add_colored_row(&mut self, row: Vec<(String, CtColor)>) {
        for (width, (cell, _)) in self.col_widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.width());
        }
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn border(&self, left: &str, junction: &str, right: &str) -> String {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|width| box_chars::H.repeat(width + 2))
            .collect();
        format!("{}{}{}", left, segments.join(junction), right)
    }

    fn print_line<'a>(&self, cells: impl Iterator<Item = (&'a str, CtColor, bool)>) {
        let mut line = box_chars::V.with(colors::ACCENT).to_string();
        for ((cell, color, bold), width) in cells.zip(&self.col_widths) {
            let pad = " ".repeat(width.saturating_sub(cell.width()));
            let styled = if bold {
                cell.with(color).bold().to_string()
            } else {
                cell.with(color).to_string()
            };
            line.push_str(&format!(" {}{} {}", styled, pad, box_chars::V.with(colors::ACCENT)));
        }
        println!("{}", line);
    }

    pub fn print(&self) {
        let edge = |left, junction, right| {
            println!("{}", self.border(left, junction, right).with(colors::ACCENT))
        };

        edge(box_chars::TOP_LEFT, box_chars::T_TOP, box_chars::TOP_RIGHT);
        self.print_line(self.headers.iter().map(|h| (h.as_str(), colors::ACCENT, true)));
        edge(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT);
        for row in &self.rows {
            self.print_line(row.iter().map(|(cell, color)| (cell.as_str(), *color, false)));
        }
        edge(box_chars::BOTTOM_LEFT, box_chars::T_BOTTOM, box_chars::BOTTOM_RIGHT);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Import Summary
// ═══════════════════════════════════════════════════════════════════════════════

pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_elapsed(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}m{:02}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

/// Every planned file with its outcome, then the recounted tables.
pub fn print_run_summary(report: &RunReport) {
    print_section_header("Import Summary");

    let mut files = TableBuilder::new(vec!["File", "Table", "Outcome", "Rows", "Time", "Notes"]);
    for file in &report.files {
        let (outcome_color, rows, time, notes) = match &file.outcome {
            FileOutcome::Succeeded {
                rows_committed,
                elapsed_ms,
                ..
            } => (
                colors::OK,
                format_count(*rows_committed),
                format_elapsed(*elapsed_ms),
                file.warnings.join("; "),
            ),
            FileOutcome::Failed {
                kind,
                diagnostic,
                rows_committed,
                elapsed_ms,
            } => (
                colors::FAIL,
                format_count(*rows_committed),
                format_elapsed(*elapsed_ms),
                format!("{}: {}", kind, diagnostic),
            ),
            FileOutcome::NotStarted { reason } => {
                (colors::MUTED, "-".to_string(), "-".to_string(), reason.clone())
            }
        };
        files.add_colored_row(vec![
            (file.file.clone(), colors::PLAIN),
            (file.table.clone(), colors::PLAIN),
            (file.outcome.label().to_string(), outcome_color),
            (rows, colors::PLAIN),
            (time, colors::MUTED),
            (notes, colors::WARN),
        ]);
    }
    if files.is_empty() {
        print_empty_list("no files planned");
    } else {
        files.print();
    }

    let mut tables = TableBuilder::new(vec!["Table", "Rows"]);
    for count in &report.table_counts {
        match (count.rows, &count.error) {
            (Some(rows), _) => tables.add_row(vec![count.table.clone(), format_count(rows)]),
            (None, error) => tables.add_colored_row(vec![
                (count.table.clone(), colors::PLAIN),
                (error.clone().unwrap_or_default(), colors::FAIL),
            ]),
        }
    }
    if !tables.is_empty() {
        println!();
        tables.print();
    }

    println!();
    for warning in &report.warnings {
        print_warning(warning);
    }
    print_key_value("Elapsed", &format_elapsed(report.elapsed_ms));
    match &report.status {
        RunStatus::Completed => print_success("Import completed"),
        RunStatus::CompletedWithFailures { failures } => {
            print_warning(&format!("Import completed with {} failed file(s)", failures))
        }
        RunStatus::Aborted { file } => print_error(&format!("Import aborted: {} failed", file)),
        RunStatus::Interrupted => print_error("Import interrupted"),
    }
}
