//! Minimal HTML table scraping for upstream release listings.
//!
//! Release pages are large but structurally simple: one `<table>` of
//! `<tr>`/`<td>` rows. This extracts the text of each cell, stripping any
//! nested markup, and leaves it to the caller to decide which rows are
//! usable. It is not a general HTML parser and does not handle nested
//! tables.

use regex::Regex;

pub struct ListingTable {
    row_re: Regex,
    cell_re: Regex,
    tag_re: Regex,
}

impl ListingTable {
    pub fn new() -> Self {
        Self {
            row_re: Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap(),
            cell_re: Regex::new(r"(?is)<td[^>]*>(.*?)</td>").unwrap(),
            tag_re: Regex::new(r"(?s)<[^>]*>").unwrap(),
        }
    }

    /// Returns the cell texts of every `<tr>` in document order. Rows
    /// without `<td>` cells (header rows) come back empty.
    pub fn rows(&self, html: &str) -> Vec<Vec<String>> {
        self.row_re
            .captures_iter(html)
            .map(|row| {
                self.cell_re
                    .captures_iter(&row[1])
                    .map(|cell| self.tag_re.replace_all(&cell[1], "").trim().to_string())
                    .collect()
            })
            .collect()
    }
}

impl Default for ListingTable {
    fn default() -> Self {
        Self::new()
    }
}
