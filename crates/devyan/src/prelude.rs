pub use crate::error::Error;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, Result};

use colored::{ColoredString, Colorize};

/// Borderless table used for every report the CLI prints.
pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();

    let format = prettytable::format::FormatBuilder::new()
        .padding(1, 1)
        .build();

    table.set_format(format);

    table
}

/// Header cell style shared by the report tables.
pub fn label(text: &str) -> ColoredString {
    text.bold().cyan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_keeps_text() {
        assert!(label("Elapsed").to_string().contains("Elapsed"));
    }
}
