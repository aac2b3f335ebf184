//! Map data parsing: the terrain tile grid and initial object placements.
//!
//! # Format
//!
//! | Field | Type |
//! |------------------|-----------------------------------|
//! | map width | u32 LE |
//! | map height | u32 LE |
//! | tiles | width × height × { u8 terrain id, u8 elevation }, row-major |
//! | object count | u32 LE |
//! | objects | count × { u16 type id, u8 owner, f32 x, f32 y } |
//!
//! The decoded shapes here are the contract with the external minimap
//! renderer: tile grid plus object placements, ids unresolved. Terrain
//! and unit ids that match no known table entry are carried through as
//! data, never rejected.

use serde::Serialize;

use crate::binary::SliceCursor;
use crate::error::{ParserError, Result};
use crate::header::{field_f32, field_u16, field_u32, field_u8};

/// A single terrain tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tile {
    /// Terrain type id, unresolved.
    pub terrain_id: u8,

    /// Elevation step.
    pub elevation: u8,
}

/// An object placed on the map before the game started (resources,
/// starting units, cliffs).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectPlacement {
    /// Unit type id, unresolved.
    pub type_id: u16,

    /// Owning player number (0 = GAIA).
    pub owner: u8,

    /// X position in tile units.
    pub x: f32,

    /// Y position in tile units.
    pub y: f32,
}

/// The decoded map: tile grid plus initial object placements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapData {
    /// Grid width in tiles.
    pub width: u32,

    /// Grid height in tiles.
    pub height: u32,

    /// Row-major tile grid, `width * height` entries.
    pub tiles: Vec<Tile>,

    /// Objects placed at game start.
    pub objects: Vec<ObjectPlacement>,
}

impl MapData {
    /// Returns the tile at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn tile(&self, x: u32, y: u32) -> Option<&Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get((y * self.width + x) as usize)
    }
}

/// Decodes the map data block.
///
/// The tile count is derived from the preceding dimension fields and
/// validated against the remaining region size before the grid is read,
/// so a hostile dimension pair cannot trigger a huge allocation.
///
/// # Errors
///
/// Returns `ParserError::HeaderDecode` when the dimensions or the object
/// count would read past the end of the header region.
pub fn decode_map(cursor: &mut SliceCursor<'_>) -> Result<MapData> {
    let width = field_u32(cursor, "map_width")?;
    let height = field_u32(cursor, "map_height")?;

    let tile_count = (width as usize)
        .checked_mul(height as usize)
        .filter(|&n| n.checked_mul(2).is_some_and(|b| b <= cursor.remaining()))
        .ok_or(ParserError::HeaderDecode {
            field: "tile_grid",
            offset: cursor.position(),
        })?;

    let mut tiles = Vec::with_capacity(tile_count);
    for _ in 0..tile_count {
        let terrain_id = field_u8(cursor, "tile_terrain")?;
        let elevation = field_u8(cursor, "tile_elevation")?;
        tiles.push(Tile {
            terrain_id,
            elevation,
        });
    }

    let object_count = field_u32(cursor, "object_count")? as usize;
    // 11 bytes per object; reject counts the region cannot hold.
    if object_count.saturating_mul(11) > cursor.remaining() {
        return Err(ParserError::HeaderDecode {
            field: "object_count",
            offset: cursor.position(),
        });
    }

    let mut objects = Vec::with_capacity(object_count);
    for _ in 0..object_count {
        let type_id = field_u16(cursor, "object_type")?;
        let owner = field_u8(cursor, "object_owner")?;
        let x = field_f32(cursor, "object_x")?;
        let y = field_f32(cursor, "object_y")?;
        objects.push(ObjectPlacement {
            type_id,
            owner,
            x,
            y,
        });
    }

    Ok(MapData {
        width,
        height,
        tiles,
        objects,
    })
}
