//! Per-cell edits of the simulation config text.
//!
//! The base config is plain text with one directive per line. A cell edit
//! swaps the optimized character's weapon and refine, rewrites the three
//! main-stat tokens of its stats line and optionally forces a talent level
//! on every character. Edits are pure; a missing anchor line is an error.

use regex::{Captures, Regex};

use crate::error::{DataError, RosterError, RosterResult};

/// Marker of a character declaration line (`"xiangling char lvl=90/90 ..."`).
const CHAR_LINE_MARKER: &str = " char lvl=";

/// First stats token values produced by the two flower main-stat rolls the
/// config generator emits.
const FLOWER_HP_TOKENS: [&str; 2] = ["hp=4780", "hp=3571"];

/// Everything that varies between two cells of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEdit<'a> {
    pub weapon: &'a str,
    pub refine: u8,
    pub main_stats: &'a str,
    pub talent_level: Option<u8>,
}

/// Produces the config text for one grid cell.
pub trait ConfigEditor {
    fn edit(&self, base: &str, cell: &CellEdit<'_>) -> Result<String, DataError>;
}

/// Names of declared characters, in team order.
#[must_use]
pub fn parse_char_order(config: &str) -> Vec<String> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| line.contains(CHAR_LINE_MARKER))
        .filter_map(|line| line.split_whitespace().next())
        .map(ToString::to_string)
        .collect()
}

/// Team slot of `character`, if declared.
#[must_use]
pub fn find_char_index(order: &[String], character: &str) -> Option<usize> {
    order.iter().position(|c| c == character)
}

fn compile(pattern: &str) -> RosterResult<Regex> {
    Regex::new(pattern).map_err(|e| RosterError::internal(format!("invalid pattern {pattern:?}: {e}")))
}

/// Line-oriented editor for one character's weapon and stats lines.
#[derive(Debug, Clone)]
pub struct TextConfigEditor {
    character: String,
    char_add_prefix: Regex,
    weapon_token: Regex,
    refine_token: Regex,
    stats_line: Regex,
    talent_token: Regex,
}

impl TextConfigEditor {
    pub fn new(character: &str) -> RosterResult<Self> {
        let quoted = regex::escape(character);
        Ok(Self {
            character: character.to_string(),
            char_add_prefix: compile(&format!(r"^{quoted}\s+add\s+"))?,
            weapon_token: compile(r#"add(\s+)weapon="[^"]*""#)?,
            refine_token: compile(r"\s+refine=[0-9]+")?,
            stats_line: compile(&format!(
                r"^({quoted}\s+add\s+stats\s+)([^\t ;]+)\s+([^\t ;]+)\s+([^\t ;]+)\s+([^\t ;]+)\s+([^\t ;]+)([ ;]?)(.*)$"
            ))?,
            talent_token: compile(r"\btalent=\d+,\d+,\d+\b")?,
        })
    }

    #[must_use]
    pub fn character(&self) -> &str {
        &self.character
    }

    fn set_weapon(&self, lines: &mut [String], weapon: &str, refine: u8) -> Result<(), DataError> {
        for line in lines.iter_mut() {
            if !self.char_add_prefix.is_match(line) || !self.weapon_token.is_match(line) {
                continue;
            }
            let updated = {
                let stripped = self.refine_token.replace_all(line, "");
                self.weapon_token
                    .replace(&stripped, |caps: &Captures<'_>| {
                        format!("add{}weapon=\"{weapon}\" refine={refine}", &caps[1])
                    })
                    .into_owned()
            };
            *line = updated;
            return Ok(());
        }
        Err(DataError::AnchorNotFound {
            anchor: "weapon line".to_string(),
            character: self.character.clone(),
        })
    }

    fn set_main_stats(&self, lines: &mut [String], main_stats: &str) -> Result<(), DataError> {
        for line in lines.iter_mut() {
            let rebuilt = {
                let Some(caps) = self.stats_line.captures(line) else {
                    continue;
                };
                if !FLOWER_HP_TOKENS.contains(&&caps[2]) {
                    continue;
                }
                let tokens: Vec<&str> = main_stats.split_whitespace().collect();
                if tokens.len() != 3 {
                    return Err(DataError::InvalidMainStats {
                        main_stats: main_stats.to_string(),
                        count: tokens.len(),
                    });
                }
                format!(
                    "{}{} {} {} {} {}{}{}",
                    &caps[1], &caps[2], &caps[3], tokens[0], tokens[1], tokens[2], &caps[7], &caps[8]
                )
            };
            *line = rebuilt;
            return Ok(());
        }
        Err(DataError::AnchorNotFound {
            anchor: "stats line".to_string(),
            character: self.character.clone(),
        })
    }

    /// Replaces or inserts `talent=L,L,L` on every character line. Inserted
    /// tokens go before the first `;`, or at the end of the line.
    pub fn apply_talent_level(&self, config: &str, level: u8) -> Result<String, DataError> {
        if !(1..=10).contains(&level) {
            return Err(DataError::TalentLevelOutOfRange { level });
        }
        let token = format!("talent={level},{level},{level}");
        let lines: Vec<String> = config
            .split('\n')
            .map(|line| {
                if !line.trim().contains(CHAR_LINE_MARKER) {
                    return line.to_string();
                }
                if self.talent_token.is_match(line) {
                    return self.talent_token.replace_all(line, token.as_str()).into_owned();
                }
                match line.find(';') {
                    Some(semi) => format!("{} {token}{}", &line[..semi], &line[semi..]),
                    None => format!("{line} {token}"),
                }
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

impl ConfigEditor for TextConfigEditor {
    fn edit(&self, base: &str, cell: &CellEdit<'_>) -> Result<String, DataError> {
        let mut lines: Vec<String> = base.split('\n').map(ToString::to_string).collect();
        self.set_weapon(&mut lines, cell.weapon, cell.refine)?;
        self.set_main_stats(&mut lines, cell.main_stats)?;
        let edited = lines.join("\n");
        match cell.talent_level {
            Some(level) => self.apply_talent_level(&edited, level),
            None => Ok(edited),
        }
    }
}
