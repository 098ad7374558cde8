//! Styles for the kindview CLI.
//!
//! Templates only ever name a style by what the text *is* (a column header, a
//! NULL marker, a page footer). This module maps those semantic names to actual
//! `console` styles, so the look can change without touching templates.
//!
//! Unknown style names render as plain text.

use console::Style;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Style identifiers shared between templates and renderers.
pub mod names {
    pub const TITLE: &str = "title";
    pub const MUTED: &str = "muted";
    pub const HEADER: &str = "header";
    pub const COLUMN_TYPE: &str = "column-type";
    pub const KEY: &str = "key";
    pub const CELL: &str = "cell";
    pub const NULL: &str = "null";
    pub const ABSENT: &str = "absent";
    pub const KIND: &str = "kind";
    pub const FOOTER: &str = "footer";
    pub const CONFIG_KEY: &str = "config-key";
    pub const ERROR: &str = "error";
    pub const WARNING: &str = "warning";
    pub const SUCCESS: &str = "success";
    pub const INFO: &str = "info";
}

#[derive(Clone, Default)]
pub struct Theme {
    styles: HashMap<&'static str, Style>,
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, name: &'static str, style: Style) -> Self {
        self.styles.insert(name, style);
        self
    }

    pub fn apply(&self, name: &str, text: &str, use_color: bool) -> String {
        match self.styles.get(name) {
            Some(style) if use_color => style.apply_to(text).force_styling(true).to_string(),
            _ => text.to_string(),
        }
    }
}

pub static THEME: Lazy<Theme> = Lazy::new(|| {
    let muted = Style::new().color256(245);
    let faint = Style::new().color256(242);

    Theme::new()
        .add(names::TITLE, Style::new().bold())
        .add(names::MUTED, muted.clone())
        .add(names::HEADER, Style::new().bold().cyan())
        .add(names::COLUMN_TYPE, faint.clone().italic())
        .add(names::KEY, Style::new().yellow())
        .add(names::CELL, Style::new())
        .add(names::NULL, faint.clone())
        .add(names::ABSENT, faint)
        .add(names::KIND, Style::new().green())
        .add(names::FOOTER, muted.clone())
        .add(names::CONFIG_KEY, Style::new().cyan())
        .add(names::ERROR, Style::new().red().bold())
        .add(names::WARNING, Style::new().yellow().bold())
        .add(names::SUCCESS, Style::new().green())
        .add(names::INFO, muted)
});
