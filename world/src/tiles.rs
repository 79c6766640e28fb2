//! Level layouts and the tile map built from the active layout.

use glam::Vec2;
use ledge_runner_core::{Aabb, CellBounds, CellCoord, TileGrid, TileKind};
use thiserror::Error;

/// Shrink applied before strict overlap queries so resting contacts do not
/// register as penetration.
const OVERLAP_SKIN: f32 = 1e-4;

/// Reasons a textual level layout may be rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout contains no rows.
    #[error("level `{name}` has no rows")]
    Empty {
        /// Name of the rejected level.
        name: String,
    },
    /// A row contains a symbol that maps to no tile.
    #[error("level `{name}` has unknown tile {symbol:?} at line {line}, column {column}")]
    UnknownTile {
        /// Name of the rejected level.
        name: String,
        /// Offending symbol.
        symbol: char,
        /// One-based line of the symbol.
        line: usize,
        /// One-based column of the symbol.
        column: usize,
    },
    /// The layout does not mark a player start.
    #[error("level `{name}` has no player start `P`")]
    MissingStart {
        /// Name of the rejected level.
        name: String,
    },
    /// The layout marks more than one player start or exit.
    #[error("level `{name}` marks `{symbol}` more than once")]
    Duplicate {
        /// Name of the rejected level.
        name: String,
        /// Symbol that appeared twice.
        symbol: char,
    },
}

/// Parsed description of a single level.
///
/// Text rows are read top to bottom; row zero of the resulting grid is the
/// bottom line of the text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelLayout {
    name: String,
    columns: i32,
    rows: i32,
    tiles: Vec<Option<TileKind>>,
    player_start: CellCoord,
    exit: Option<CellCoord>,
}

impl LevelLayout {
    /// Parses a layout from ASCII rows.
    ///
    /// `#` ground, `^` trap, `~` hazard, `P` player start, `E` exit, and `.`
    /// or space for empty cells.
    pub fn parse<S: AsRef<str>>(name: &str, lines: &[S]) -> Result<Self, LayoutError> {
        if lines.is_empty() {
            return Err(LayoutError::Empty {
                name: name.to_owned(),
            });
        }

        let rows = lines.len();
        let columns = lines
            .iter()
            .map(|line| line.as_ref().chars().count())
            .max()
            .unwrap_or(0);
        let mut tiles = vec![None; rows * columns];
        let mut player_start = None;
        let mut exit = None;

        for (line_index, line) in lines.iter().enumerate() {
            let row = rows - 1 - line_index;
            for (column, symbol) in line.as_ref().chars().enumerate() {
                let cell = CellCoord::new(column as i32, row as i32);
                let kind = match symbol {
                    '#' => Some(TileKind::Ground),
                    '^' => Some(TileKind::Trap),
                    '~' => Some(TileKind::Hazard),
                    '.' | ' ' => None,
                    'P' => {
                        if player_start.replace(cell).is_some() {
                            return Err(LayoutError::Duplicate {
                                name: name.to_owned(),
                                symbol,
                            });
                        }
                        None
                    }
                    'E' => {
                        if exit.replace(cell).is_some() {
                            return Err(LayoutError::Duplicate {
                                name: name.to_owned(),
                                symbol,
                            });
                        }
                        None
                    }
                    other => {
                        return Err(LayoutError::UnknownTile {
                            name: name.to_owned(),
                            symbol: other,
                            line: line_index + 1,
                            column: column + 1,
                        })
                    }
                };
                tiles[row * columns + column] = kind;
            }
        }

        let player_start = player_start.ok_or_else(|| LayoutError::MissingStart {
            name: name.to_owned(),
        })?;

        Ok(Self {
            name: name.to_owned(),
            columns: columns as i32,
            rows: rows as i32,
            tiles,
            player_start,
            exit,
        })
    }

    /// Human-readable name of the level.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cell the player occupies when the level loads.
    #[must_use]
    pub const fn player_start(&self) -> CellCoord {
        self.player_start
    }

    /// Cell holding the level exit, if the level has one.
    #[must_use]
    pub const fn exit(&self) -> Option<CellCoord> {
        self.exit
    }

    /// Builds the tile map for the layout using square cells of `cell_length`.
    #[must_use]
    pub fn tile_map(&self, cell_length: f32) -> TileMap {
        TileMap {
            columns: self.columns,
            rows: self.rows,
            cell_size: Vec2::splat(cell_length),
            origin: Vec2::ZERO,
            cells: self.tiles.clone(),
        }
    }
}

/// Dense tile storage of the active level.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMap {
    columns: i32,
    rows: i32,
    cell_size: Vec2,
    origin: Vec2,
    cells: Vec<Option<TileKind>>,
}

impl TileMap {
    /// Tile stored in the cell. Cells outside the map are empty.
    #[must_use]
    pub fn kind(&self, cell: CellCoord) -> Option<TileKind> {
        self.index(cell).and_then(|index| self.cells[index])
    }

    /// World-space position of the map's lower-left corner.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Cell containing the world-space point.
    #[must_use]
    pub fn cell_at(&self, point: Vec2) -> CellCoord {
        let local = (point - self.origin) / self.cell_size;
        CellCoord::new(local.x.floor() as i32, local.y.floor() as i32)
    }

    /// World-space box covered by the cell.
    #[must_use]
    pub fn cell_aabb(&self, cell: CellCoord) -> Aabb {
        Aabb::new(self.cell_center_world(cell), self.cell_size * 0.5)
    }

    /// Cells that overlap or touch the area.
    #[must_use]
    pub fn cells_touching(&self, area: Aabb) -> CellBounds {
        let min = (area.min() - self.origin) / self.cell_size;
        let max = (area.max() - self.origin) / self.cell_size;
        CellBounds::new(
            CellCoord::new(min.x.ceil() as i32 - 1, min.y.ceil() as i32 - 1),
            CellCoord::new(max.x.floor() as i32 + 1, max.y.floor() as i32 + 1),
        )
    }

    /// Cells whose interior strictly overlaps the area.
    #[must_use]
    pub fn cells_overlapping(&self, area: Aabb) -> CellBounds {
        let shrunk = Aabb::new(
            area.center,
            (area.half_extents - Vec2::splat(OVERLAP_SKIN)).max(Vec2::ZERO),
        );
        let min = (shrunk.min() - self.origin) / self.cell_size;
        let max = (shrunk.max() - self.origin) / self.cell_size;
        CellBounds::new(
            CellCoord::new(min.x.floor() as i32, min.y.floor() as i32),
            CellCoord::new(max.x.ceil() as i32, max.y.ceil() as i32),
        )
    }

    /// Reports whether any cell touching the area holds a tile of `kind`.
    #[must_use]
    pub fn touches_kind(&self, area: Aabb, kind: TileKind) -> bool {
        self.cells_touching(area)
            .cells()
            .any(|cell| self.kind(cell) == Some(kind))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < 0
            || cell.row() < 0
            || cell.column() >= self.columns
            || cell.row() >= self.rows
        {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }
}

impl TileGrid for TileMap {
    fn has_ground(&self, cell: CellCoord) -> bool {
        self.kind(cell) == Some(TileKind::Ground)
    }

    fn cell_bounds(&self) -> CellBounds {
        CellBounds::new(
            CellCoord::new(0, 0),
            CellCoord::new(self.columns, self.rows),
        )
    }

    fn cell_center_world(&self, cell: CellCoord) -> Vec2 {
        self.origin
            + Vec2::new(
                (cell.column() as f32 + 0.5) * self.cell_size.x,
                (cell.row() as f32 + 0.5) * self.cell_size.y,
            )
    }

    fn cell_size(&self) -> Vec2 {
        self.cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flips_rows_so_bottom_line_is_row_zero() {
        let layout = LevelLayout::parse("flip", &["P..", "###"]).expect("valid layout");
        let map = layout.tile_map(1.0);
        assert!(map.has_ground(CellCoord::new(0, 0)));
        assert!(!map.has_ground(CellCoord::new(0, 1)));
        assert_eq!(layout.player_start(), CellCoord::new(0, 1));
    }

    #[test]
    fn parse_pads_short_rows_with_empty_cells() {
        let layout = LevelLayout::parse("ragged", &["P", "#^~"]).expect("valid layout");
        let map = layout.tile_map(2.0);
        assert_eq!(map.kind(CellCoord::new(1, 0)), Some(TileKind::Trap));
        assert_eq!(map.kind(CellCoord::new(2, 0)), Some(TileKind::Hazard));
        assert_eq!(map.kind(CellCoord::new(2, 1)), None);
        assert_eq!(
            map.cell_center_world(CellCoord::new(1, 0)),
            Vec2::new(3.0, 1.0)
        );
    }

    #[test]
    fn parse_rejects_unknown_symbols() {
        let error = LevelLayout::parse("bad", &["P?", "##"]).unwrap_err();
        assert_eq!(
            error,
            LayoutError::UnknownTile {
                name: "bad".to_owned(),
                symbol: '?',
                line: 1,
                column: 2,
            }
        );
    }

    #[test]
    fn parse_requires_single_player_start() {
        assert!(matches!(
            LevelLayout::parse("none", &["..", "##"]),
            Err(LayoutError::MissingStart { .. })
        ));
        assert!(matches!(
            LevelLayout::parse("twice", &["PP", "##"]),
            Err(LayoutError::Duplicate { symbol: 'P', .. })
        ));
        assert!(matches!(
            LevelLayout::parse::<&str>("empty", &[]),
            Err(LayoutError::Empty { .. })
        ));
    }

    #[test]
    fn resting_contact_is_not_strict_overlap() {
        let layout = LevelLayout::parse("floor", &["P", "#"]).expect("valid layout");
        let map = layout.tile_map(1.0);
        let resting = Aabb::new(Vec2::new(0.5, 1.5), Vec2::splat(0.5));
        let bounds = map.cells_overlapping(resting);
        assert!(bounds.cells().all(|cell| !map.has_ground(cell)));
        assert!(map.touches_kind(resting, TileKind::Ground));
    }
}
