use serde::{Deserialize, Serialize};

use super::GenreId;

/// Search term, genre filter and page: everything the browse list depends on.
///
/// Search term and genre are mutually exclusive; setting either one to a
/// non-empty value clears the other and rewinds to the first page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageQuery {
    pub search_term: String,
    pub genre: Option<GenreId>,
    pub page: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            genre: None,
            page: 1,
        }
    }
}

impl PageQuery {
    /// Updates the search term. A non-empty term clears the genre and resets the page.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        if !self.search_term.is_empty() {
            self.genre = None;
            self.page = 1;
        }
    }

    /// Selects a genre (`None` is "All"), clearing the search term and resetting the page.
    pub fn select_genre(&mut self, genre: Option<GenreId>) {
        self.genre = genre;
        self.search_term.clear();
        self.page = 1;
    }

    pub fn clear_search(&mut self) {
        self.search_term.clear();
        self.page = 1;
    }

    pub fn is_home(&self) -> bool {
        self.search_term.is_empty() && self.genre.is_none() && self.page == 1
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Browse,
    Watchlist,
}

/// Raw page-jump input, either a number or whatever the user typed
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PageInput {
    Number(i64),
    Text(String),
}

impl PageInput {
    pub fn clamp(&self, total_pages: u32) -> u32 {
        match self {
            PageInput::Number(n) => clamp_page(Some(*n), total_pages),
            PageInput::Text(text) => clamp_page_input(text, total_pages),
        }
    }
}

/// Clamps a page-jump input to `1..=total_pages`.
///
/// Parses the leading integer (`"12abc"` is 12); unparsable or < 1 becomes 1.
pub fn clamp_page_input(input: &str, total_pages: u32) -> u32 {
    clamp_page(leading_integer(input), total_pages)
}

fn clamp_page(requested: Option<i64>, total_pages: u32) -> u32 {
    let last = i64::from(total_pages.max(1));
    match requested {
        Some(n) if n >= 1 => n.min(last) as u32,
        _ => 1,
    }
}

fn leading_integer(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate absurdly long inputs instead of rejecting them
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * value)
}
