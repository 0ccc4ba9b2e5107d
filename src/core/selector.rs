//! Reducing the normalized list to what gets downloaded
//!
//! Direct mode is a pure function of the list. Interactive mode reads
//! 1-based indices from any [`BufRead`], so the CLI passes stdin and tests
//! pass a byte slice.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::core::error::{Error, Result};
use crate::core::item::DisplayItem;

/// Prefix of `items` up to `limit`
pub fn select(items: &[DisplayItem], limit: usize) -> Vec<DisplayItem> {
    items.iter().take(limit).cloned().collect()
}

/// Keep at most `limit` items per source, preserving overall order
pub fn select_per_source(items: &[DisplayItem], limit: usize) -> Vec<DisplayItem> {
    let mut taken: HashMap<&str, usize> = HashMap::new();
    items
        .iter()
        .filter(|item| {
            let count = taken.entry(item.source.as_str()).or_default();
            *count += 1;
            *count <= limit
        })
        .cloned()
        .collect()
}

/// Parse a selection such as `1,3 5-7` or `all` into sorted 0-based indices.
///
/// Empty input selects nothing. Any index outside `1..=len` rejects the
/// whole line.
pub fn parse_selection(input: &str, len: usize) -> Result<Vec<usize>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if input.eq_ignore_ascii_case("all") {
        return Ok((0..len).collect());
    }

    let mut picked = Vec::new();
    for token in input.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()) {
        let (start, end) = match token.split_once('-') {
            Some((a, b)) => (parse_index(a, len)?, parse_index(b, len)?),
            None => {
                let i = parse_index(token, len)?;
                (i, i)
            }
        };
        if start > end {
            return Err(Error::InvalidInput(format!("range '{token}' is reversed")));
        }
        picked.extend(start..=end);
    }
    picked.sort_unstable();
    picked.dedup();
    Ok(picked.into_iter().map(|i| i - 1).collect())
}

fn parse_index(token: &str, len: usize) -> Result<usize> {
    let index: usize = token
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("'{token}' is not a number")))?;
    if index == 0 || index > len {
        return Err(Error::InvalidInput(format!("{index} is out of range (1-{len})")));
    }
    Ok(index)
}

/// Print the numbered list and prompt until a valid selection is entered.
///
/// End of input counts as an empty selection.
pub fn select_interactive<R, W>(items: &[DisplayItem], input: &mut R, output: &mut W) -> Result<Vec<DisplayItem>>
where
    R: BufRead,
    W: Write,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    for (i, item) in items.iter().enumerate() {
        writeln!(output, "{:>3}. {item}", i + 1)?;
    }

    loop {
        write!(
            output,
            "Select items to download (e.g. 1,3 5-7, 'all', empty for none): "
        )?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(Vec::new());
        }
        match parse_selection(&line, items.len()) {
            Ok(indices) => return Ok(indices.into_iter().map(|i| items[i].clone()).collect()),
            Err(e) => writeln!(output, "❌ {e}")?,
        }
    }
}
