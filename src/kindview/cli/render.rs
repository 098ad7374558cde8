//! # Rendering Module
//!
//! Styled terminal output for the CLI. Data is laid out here and handed to the
//! templates in [`super::templates`], which apply named styles from
//! [`super::styles`] through a `style` filter.
//!
//! Color is decided once per call: `--no-color` or a terminal without color
//! support turns the `style` filter into a no-op.

use super::styles::{names, THEME};
use super::templates::{
    BROWSE_HELP_TEMPLATE, CONFIG_TEMPLATE, KINDS_TEMPLATE, MESSAGES_TEMPLATE, PAGE_TEMPLATE,
};
use console::Term;
use kindview::controller::PageView;
use kindview::display::{CellKind, DisplayRecord};
use kindview::model::KEY_PROPERTY;
use minijinja::{Environment, Value};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

/// Widest a table column may get before its cells are truncated.
pub const MAX_COLUMN_WIDTH: usize = 40;
const COLUMN_GAP: &str = "  ";
const ELLIPSIS: char = '…';

/// Whether styled output should be produced for stdout.
pub fn use_color(no_color: bool) -> bool {
    !no_color && Term::stdout().features().colors_supported()
}

/// Renders a template with explicit color control.
pub fn render_with_color<T: Serialize>(
    template: &str,
    data: &T,
    use_color: bool,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_filter("style", move |value: Value, name: String| -> String {
        THEME.apply(&name, &value.to_string(), use_color)
    });
    env.add_template("_inline", template)?;
    env.get_template("_inline")?.render(data)
}

fn with_newline(mut output: String) -> String {
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}

#[derive(Serialize)]
struct Cell {
    text: String,
    pad: String,
    style: &'static str,
}

#[derive(Serialize)]
struct PageData {
    kind: String,
    sort_label: String,
    empty: bool,
    header_cells: Vec<Cell>,
    type_cells: Vec<Cell>,
    rows: Vec<Vec<Cell>>,
    footer: String,
}

#[derive(Serialize)]
struct KindsData<'a> {
    kinds: &'a [String],
}

#[derive(Serialize)]
struct ConfigEntry {
    key: String,
    pad: String,
    value: String,
}

#[derive(Serialize)]
struct ConfigData {
    entries: Vec<ConfigEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: MessageLevel,
    pub content: String,
}

impl Message {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct MessageData {
    content: String,
    style: &'static str,
}

#[derive(Serialize)]
struct MessagesData {
    messages: Vec<MessageData>,
}

#[derive(Serialize)]
struct HelpLine {
    usage: &'static str,
    pad: String,
    about: &'static str,
}

#[derive(Serialize)]
struct BrowseHelpData {
    commands: Vec<HelpLine>,
}

/// Line commands understood by the interactive browser, for its help screen.
pub const BROWSE_COMMANDS: &[(&str, &str)] = &[
    ("n, next", "next page"),
    ("p, prev", "previous page"),
    ("s, sort <property>", "cycle sort on a property: desc, asc, off"),
    ("k, kind <kind>", "switch to another kind"),
    ("kinds", "list kinds"),
    ("r, refresh", "redraw the current page"),
    ("h, help", "show this help"),
    ("q, quit", "leave"),
];

/// Renders one page of a kind as an aligned table.
pub fn render_page(view: &PageView, use_color: bool) -> String {
    let data = layout_page(view);
    render_with_color(PAGE_TEMPLATE, &data, use_color)
        .map(with_newline)
        .unwrap_or_else(|e| format!("Render error: {}\n", e))
}

fn layout_page(view: &PageView) -> PageData {
    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| single_line(cell)).collect())
        .collect();

    let widths: Vec<usize> = view
        .headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let cells = rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.width());
            cells
                .chain([header.name.width(), header.type_name.width()])
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();
    let last = widths.len().saturating_sub(1);

    let header_cells = view
        .headers
        .iter()
        .enumerate()
        .map(|(i, header)| fit(&header.name, widths[i], i == last, names::HEADER))
        .collect();
    let type_cells = view
        .headers
        .iter()
        .enumerate()
        .map(|(i, header)| fit(&header.type_name, widths[i], i == last, names::COLUMN_TYPE))
        .collect();

    let table_rows = rows
        .iter()
        .zip(&view.cell_kinds)
        .map(|(row, kinds)| {
            row.iter()
                .zip(kinds)
                .enumerate()
                .map(|(i, (cell, &kind))| {
                    let style = cell_style(&view.headers[i].name, kind);
                    fit(cell, widths[i], i == last, style)
                })
                .collect()
        })
        .collect();

    let sort_label = if view.sort_key.is_empty() || view.direction.is_empty() {
        String::new()
    } else {
        format!("sorted by {} ({})", view.sort_key, view.direction)
    };

    PageData {
        kind: view.kind.clone(),
        sort_label,
        empty: view.rows.is_empty(),
        header_cells,
        type_cells,
        rows: table_rows,
        footer: footer(view),
    }
}

fn cell_style(column: &str, kind: CellKind) -> &'static str {
    if column == KEY_PROPERTY {
        return names::KEY;
    }
    match kind {
        CellKind::Null => names::NULL,
        CellKind::Absent => names::ABSENT,
        CellKind::Value => names::CELL,
    }
}

fn fit(text: &str, width: usize, last: bool, style: &'static str) -> Cell {
    let text = truncate_to_width(text, width);
    let pad = if last {
        String::new()
    } else {
        format!("{}{}", " ".repeat(width.saturating_sub(text.width())), COLUMN_GAP)
    };
    Cell { text, pad, style }
}

fn footer(view: &PageView) -> String {
    if view.rows.is_empty() {
        return format!("Page {} · no rows", view.page);
    }
    let mut footer = format!(
        "Page {} · rows {}-{}",
        view.page, view.first_row, view.last_row
    );
    if view.has_next_page {
        footer.push_str(" · more available");
    }
    footer
}

/// Table cells are one line each.
fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    let limit = max_width.saturating_sub(1);

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > limit {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push(ELLIPSIS);
    result
}

#[derive(Serialize)]
struct JsonPage<'a> {
    kind: &'a str,
    sort_key: &'a str,
    direction: &'a str,
    page: usize,
    has_next_page: bool,
    has_prev_page: bool,
    entities: &'a [DisplayRecord],
}

/// The page as pretty-printed JSON, one object per entity keyed by property name.
pub fn render_page_json(
    view: &PageView,
    entities: &[DisplayRecord],
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonPage {
        kind: &view.kind,
        sort_key: &view.sort_key,
        direction: &view.direction,
        page: view.page,
        has_next_page: view.has_next_page,
        has_prev_page: view.has_prev_page,
        entities,
    })
}

pub fn render_kinds(kinds: &[String], use_color: bool) -> String {
    render_with_color(KINDS_TEMPLATE, &KindsData { kinds }, use_color)
        .map(with_newline)
        .unwrap_or_else(|_| kinds.iter().map(|k| format!("{}\n", k)).collect())
}

pub fn render_config(entries: &[(&str, String)], use_color: bool) -> String {
    let width = entries.iter().map(|(key, _)| key.width()).max().unwrap_or(0);
    let data = ConfigData {
        entries: entries
            .iter()
            .map(|(key, value)| ConfigEntry {
                key: key.to_string(),
                pad: " ".repeat(width - key.width()),
                value: value.clone(),
            })
            .collect(),
    };
    render_with_color(CONFIG_TEMPLATE, &data, use_color)
        .map(with_newline)
        .unwrap_or_else(|e| format!("Render error: {}\n", e))
}

pub fn render_messages(messages: &[Message], use_color: bool) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let data = MessagesData {
        messages: messages
            .iter()
            .map(|msg| MessageData {
                content: msg.content.clone(),
                style: match msg.level {
                    MessageLevel::Info => names::INFO,
                    MessageLevel::Success => names::SUCCESS,
                    MessageLevel::Warning => names::WARNING,
                    MessageLevel::Error => names::ERROR,
                },
            })
            .collect(),
    };

    render_with_color(MESSAGES_TEMPLATE, &data, use_color)
        .map(with_newline)
        .unwrap_or_else(|_| {
            messages
                .iter()
                .map(|m| format!("{}\n", m.content))
                .collect()
        })
}

pub fn render_browse_help(use_color: bool) -> String {
    let width = BROWSE_COMMANDS
        .iter()
        .map(|(usage, _)| usage.width())
        .max()
        .unwrap_or(0);
    let data = BrowseHelpData {
        commands: BROWSE_COMMANDS
            .iter()
            .map(|&(usage, about)| HelpLine {
                usage,
                pad: " ".repeat(width - usage.width()),
                about,
            })
            .collect(),
    };
    render_with_color(BROWSE_HELP_TEMPLATE, &data, use_color)
        .map(with_newline)
        .unwrap_or_else(|e| format!("Render error: {}\n", e))
}
