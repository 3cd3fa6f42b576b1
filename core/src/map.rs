//! Raw initial maps as supplied by collaborators.

use thiserror::Error;

use crate::{EntityType, Position};

/// Rectangular grid of single-character cell tags, indexed `map[row][column]`.
pub type RawMap = Vec<Vec<char>>;

/// Number of rows contained in a raw map.
#[must_use]
pub fn board_height(map: &[Vec<char>]) -> u32 {
    u32::try_from(map.len()).unwrap_or(u32::MAX)
}

/// Number of columns contained in a raw map, measured on its first row.
#[must_use]
pub fn board_width(map: &[Vec<char>]) -> u32 {
    map.first()
        .map_or(0, |row| u32::try_from(row.len()).unwrap_or(u32::MAX))
}

/// Parses the line-oriented text form of a map.
///
/// Each line is one row. Carriage returns are stripped and trailing blank
/// lines ignored so that files edited on any platform load identically.
/// Tags themselves are validated when the world is constructed.
pub fn parse_map(text: &str) -> Result<RawMap, InvalidMapError> {
    let mut rows: RawMap = text
        .lines()
        .map(|line| line.trim_end_matches('\r').chars().collect::<Vec<_>>())
        .collect();
    while rows.last().is_some_and(Vec::is_empty) {
        let _ = rows.pop();
    }

    if rows.is_empty() {
        return Err(InvalidMapError::Empty);
    }
    Ok(rows)
}

/// Reasons an initial map is rejected at construction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidMapError {
    /// The map contained no cells.
    #[error("map contains no cells")]
    Empty,
    /// A row's length differs from the first row's length.
    #[error("row {row} has {found} cells but the map is {expected} cells wide")]
    JaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width established by the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A cell carried a tag outside the known set.
    #[error("unrecognised tag {tag:?} at {position}")]
    UnknownTag {
        /// Tag that failed to parse.
        tag: char,
        /// Cell that carried the tag.
        position: Position,
    },
    /// The map did not contain a player.
    #[error("map does not contain a player")]
    MissingPlayer,
    /// The map contained more than one player.
    #[error("map contains {count} players; exactly one is required")]
    MultiplePlayers {
        /// Number of player tags found.
        count: usize,
    },
    /// The simulation would be finished before its first tick because no zombie can act.
    #[error("map contains no living zombies")]
    NoLivingZombies,
    /// The simulation would be finished before its first tick because the player starts dead.
    #[error("player starts without health")]
    PlayerWithoutHealth,
    /// An obstacle would start destroyed because its configured health is zero.
    #[error("{kind:?} obstacles start without health")]
    ObstacleWithoutHealth {
        /// Kind of the obstacle placed on the map.
        kind: EntityType,
    },
}
