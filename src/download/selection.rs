//! Chapter selection
//!
//! Positions are 1-based over the order of the chapter listing, never over
//! the numbers that appear in chapter labels.

use crate::source::Listing;
use crate::SelectionError;
use std::fmt;
use std::str::FromStr;

/// Which chapters of a title to install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChapterSelection {
    #[default]
    All,
    Single(usize),
    Range(usize, usize),
}

impl ChapterSelection {
    /// Parses optional CLI text; no text selects every chapter
    pub fn parse(text: Option<&str>) -> Result<Self, SelectionError> {
        match text {
            None => Ok(ChapterSelection::All),
            Some(text) => text.parse(),
        }
    }

    /// Checks position bounds and range direction
    pub fn validate(&self) -> Result<(), SelectionError> {
        match *self {
            ChapterSelection::All => Ok(()),
            ChapterSelection::Single(n) => check_position(n),
            ChapterSelection::Range(start, end) => {
                check_position(start)?;
                check_position(end)?;
                if start > end {
                    return Err(SelectionError::InvertedRange { start, end });
                }
                Ok(())
            }
        }
    }

    fn contains(&self, position: usize) -> bool {
        match *self {
            ChapterSelection::All => true,
            ChapterSelection::Single(n) => position == n,
            ChapterSelection::Range(start, end) => (start..=end).contains(&position),
        }
    }
}

fn check_position(n: usize) -> Result<(), SelectionError> {
    if n == 0 {
        Err(SelectionError::ZeroPosition(n))
    } else {
        Ok(())
    }
}

fn parse_position(text: &str, original: &str) -> Result<usize, SelectionError> {
    text.trim()
        .parse::<usize>()
        .map_err(|_| SelectionError::Syntax(original.to_string()))
}

impl FromStr for ChapterSelection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();

        let selection = if text.eq_ignore_ascii_case("all") {
            ChapterSelection::All
        } else if let Some((start, end)) = text.split_once('-') {
            ChapterSelection::Range(parse_position(start, s)?, parse_position(end, s)?)
        } else {
            ChapterSelection::Single(parse_position(text, s)?)
        };

        selection.validate()?;
        Ok(selection)
    }
}

impl fmt::Display for ChapterSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterSelection::All => write!(f, "all"),
            ChapterSelection::Single(n) => write!(f, "{}", n),
            ChapterSelection::Range(start, end) => write!(f, "{}-{}", start, end),
        }
    }
}

/// Picks the selected (label, locator) pairs, keeping listing order
///
/// Positions past the end of the listing are ignored; a selection that
/// matches nothing is an error.
pub fn select_chapters(
    chapters: &Listing,
    selection: &ChapterSelection,
) -> Result<Vec<(String, String)>, SelectionError> {
    selection.validate()?;

    let selected: Vec<(String, String)> = chapters
        .iter()
        .enumerate()
        .filter(|(index, _)| selection.contains(index + 1))
        .map(|(_, (label, locator))| (label.to_string(), locator.to_string()))
        .collect();

    if selected.is_empty() {
        return Err(SelectionError::Empty {
            available: chapters.len(),
        });
    }

    Ok(selected)
}
