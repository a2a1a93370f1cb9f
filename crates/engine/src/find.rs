//! Search order and string matching for `CodeArray::find_next_match`.

use cubesheet_core::CellKey;
use regex::{Regex, RegexBuilder};

use crate::error::GridError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// How a find walks the grid and compares text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindFlags {
    pub direction: Direction,
    pub match_case: bool,
    pub whole_word: bool,
    pub regex: bool,
}

impl Default for FindFlags {
    fn default() -> Self {
        Self {
            direction: Direction::Down,
            match_case: false,
            whole_word: false,
            regex: false,
        }
    }
}

impl FindFlags {
    /// Build flags from names: exactly one of `UP`/`DOWN`, plus any of
    /// `MATCH_CASE`, `WHOLE_WORD` and `REG_EXP`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, GridError> {
        let mut direction = None;
        let mut flags = Self::default();

        for name in names {
            match name.as_ref() {
                "UP" | "DOWN" => {
                    if direction.is_some() {
                        return Err(GridError::InvalidFlags(
                            "exactly one of UP and DOWN may be given".to_string(),
                        ));
                    }
                    direction = Some(if name.as_ref() == "UP" {
                        Direction::Up
                    } else {
                        Direction::Down
                    });
                }
                "MATCH_CASE" => flags.match_case = true,
                "WHOLE_WORD" => flags.whole_word = true,
                "REG_EXP" => flags.regex = true,
                other => return Err(GridError::InvalidFlags(format!("unknown flag {other}"))),
            }
        }

        flags.direction = direction.ok_or_else(|| {
            GridError::InvalidFlags("one of UP and DOWN is required".to_string())
        })?;
        Ok(flags)
    }
}

/// Compiled form of a needle under a set of flags.
#[derive(Debug, Clone)]
pub enum Matcher {
    Substring { needle: String, match_case: bool },
    Pattern(Regex),
}

impl Matcher {
    pub fn new(needle: &str, flags: &FindFlags) -> Result<Self, GridError> {
        let pattern = if flags.regex {
            needle.to_string()
        } else if flags.whole_word {
            format!(r"\b{}\b", regex::escape(needle))
        } else {
            return Ok(Matcher::Substring {
                needle: if flags.match_case { needle.to_string() } else { needle.to_lowercase() },
                match_case: flags.match_case,
            });
        };

        RegexBuilder::new(&pattern)
            .case_insensitive(!flags.match_case)
            .build()
            .map(Matcher::Pattern)
            .map_err(|e| GridError::InvalidPattern(e.to_string()))
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            Matcher::Substring { needle, match_case: true } => haystack.contains(needle.as_str()),
            Matcher::Substring { needle, match_case: false } => {
                haystack.to_lowercase().contains(needle.as_str())
            }
            Matcher::Pattern(re) => re.is_match(haystack),
        }
    }
}

/// Order `keys` for a wrap-around search starting at `start`.
///
/// Keys are compared as (table, col, row). Searching down, the first key is
/// the smallest one not before `start`; searching up, the largest one not
/// after it. The walk then wraps past the end of the grid.
pub fn sorted_keys(mut keys: Vec<CellKey>, start: CellKey, direction: Direction) -> Vec<CellKey> {
    let origin = start.reversed();
    let pos = match direction {
        Direction::Down => {
            keys.sort_by_key(|k| k.reversed());
            keys.iter().filter(|k| k.reversed() < origin).count()
        }
        Direction::Up => {
            keys.sort_by_key(|k| std::cmp::Reverse(k.reversed()));
            keys.iter().filter(|k| k.reversed() > origin).count()
        }
    };
    keys.rotate_left(pos);
    keys
}
