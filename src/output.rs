//! CLI output formatting.
//!
//! # Display Contract
//!
//! Every item is shown by its name first, with the id, URL and other
//! details as indented context lines underneath:
//!
//! ```text
//! Library (2 images)
//! 001 beach.jpg
//!     Id: 2
//!     URL: https://cdn.example.com/blog-images/u1/1767225600000-3f9a1c0e.jpg
//!     Added: 2026-01-02 00:00 UTC
//! 002 Sunset.png
//!     Id: 1
//!     ...
//! ```
//!
//! ## Item info
//!
//! ```text
//! Sunset.png
//!     Id: 1
//!     URL: https://…/u1/1-a.jpg
//!     Added: 2026-01-01 00:00 UTC
//!     Dimensions: 400 × 200
//!     Size: 12.4 KB
//! ```
//!
//! ## Edits
//!
//! ```text
//! Edit Sunset.png
//!     Crop: x 10.0% y 20.0% w 50.0% h 40.0% (aspect 4:3)
//!     Scale: 50%
//!     Filter: brightness(120%) contrast(100%) saturate(100%)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::gateway::BulkDeleteReport;
use crate::imaging::CropUnit;
use crate::library::{Notice, NoticeLevel, UploadReport};
use crate::metadata::ImageMetadata;
use crate::session::PreviewSession;
use crate::types::MediaItem;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn item_context(item: &MediaItem) -> Vec<String> {
    vec![
        format!("{}Id: {}", indent(1), item.id),
        format!("{}URL: {}", indent(1), item.url),
        format!(
            "{}Added: {}",
            indent(1),
            item.created_at.format("%Y-%m-%d %H:%M UTC")
        ),
    ]
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Library listing
// ============================================================================

pub fn format_library(items: &[&MediaItem], search: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let count = plural(items.len(), "image");
    if search.trim().is_empty() {
        lines.push(format!("Library ({count})"));
    } else {
        lines.push(format!("Library ({count} matching \"{}\")", search.trim()));
    }
    if items.is_empty() {
        lines.push(format!("{}(no images)", indent(1)));
    }
    for (i, item) in items.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), item.name));
        lines.extend(item_context(item));
    }
    lines
}

pub fn print_library(items: &[&MediaItem], search: &str) {
    print_lines(format_library(items, search));
}

// ============================================================================
// Item info
// ============================================================================

pub fn format_item_info(item: &MediaItem, metadata: Option<&ImageMetadata>) -> Vec<String> {
    let mut lines = vec![item.name.clone()];
    lines.extend(item_context(item));
    match metadata {
        Some(meta) => {
            lines.push(format!(
                "{}Dimensions: {} × {}",
                indent(1),
                meta.width,
                meta.height
            ));
            if let Some(size) = &meta.file_size {
                lines.push(format!("{}Size: {}", indent(1), size));
            }
        }
        None => lines.push(format!("{}Dimensions: unavailable", indent(1))),
    }
    lines
}

pub fn print_item_info(item: &MediaItem, metadata: Option<&ImageMetadata>) {
    print_lines(format_item_info(item, metadata));
}

// ============================================================================
// Edits
// ============================================================================

pub fn format_edit_summary(session: &PreviewSession) -> Vec<String> {
    let mut lines = vec![format!("Edit {}", session.item.name)];

    match (session.cropping, session.crop) {
        (true, Some(crop)) => {
            let unit = match crop.unit {
                CropUnit::Percent => "%",
                CropUnit::Pixel => "px",
            };
            let aspect = session
                .aspect
                .map(|a| format!(" (aspect {a})"))
                .unwrap_or_default();
            lines.push(format!(
                "{}Crop: x {:.1}{unit} y {:.1}{unit} w {:.1}{unit} h {:.1}{unit}{aspect}",
                indent(1),
                crop.x,
                crop.y,
                crop.width,
                crop.height
            ));
        }
        _ => lines.push(format!("{}Crop: none", indent(1))),
    }
    lines.push(format!("{}Scale: {}%", indent(1), session.scale.percent()));
    lines.push(format!(
        "{}Filter: {}",
        indent(1),
        session.filters.css_filter_expression()
    ));
    if !session.is_edited() {
        lines.push(format!("{}(no changes)", indent(1)));
    }
    lines
}

pub fn print_edit_summary(session: &PreviewSession) {
    print_lines(format_edit_summary(session));
}

// ============================================================================
// Reports
// ============================================================================

pub fn format_upload_report(report: &UploadReport) -> Vec<String> {
    let mut lines = vec![format!("Uploaded {}", plural(report.uploaded.len(), "image"))];
    for item in &report.uploaded {
        lines.push(format!("{}{} → {}", indent(1), item.name, item.url));
    }
    for (name, reason) in &report.skipped {
        lines.push(format!("{}Skipped {}: {}", indent(1), name, reason));
    }
    lines
}

pub fn print_upload_report(report: &UploadReport) {
    print_lines(format_upload_report(report));
}

pub fn format_bulk_report(report: &BulkDeleteReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Deleted {} of {}",
        report.deleted,
        plural(report.requested, "image")
    )];
    for (id, reason) in &report.failed {
        lines.push(format!("{}Failed {}: {}", indent(1), id, reason));
    }
    lines
}

pub fn print_bulk_report(report: &BulkDeleteReport) {
    print_lines(format_bulk_report(report));
}

pub fn format_notices(notices: &[Notice]) -> Vec<String> {
    notices
        .iter()
        .map(|n| match n.level {
            NoticeLevel::Success => format!("✓ {}", n.message),
            NoticeLevel::Error => format!("✗ {}", n.message),
        })
        .collect()
}

pub fn print_notices(notices: &[Notice]) {
    print_lines(format_notices(notices));
}
