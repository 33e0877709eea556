use bevy::prelude::*;

/// Tile position in editor pixel space (top-left corner of the tile).
/// Editor y grows downward; Bevy world y grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Snap a world position (in pixels) to the top-left corner of the tile containing it
    pub fn snap(world_pos: Vec2, tile_size: i32) -> Self {
        let size = tile_size as f32;
        Self {
            x: (world_pos.x / size).floor() as i32 * tile_size,
            y: (-world_pos.y / size).floor() as i32 * tile_size,
        }
    }

    /// World position of the tile's center, for placing sprites
    pub fn to_world_center(&self, tile_size: i32) -> Vec2 {
        let half = tile_size as f32 / 2.0;
        Vec2::new(self.x as f32 + half, -(self.y as f32 + half))
    }
}

impl From<(i32, i32)> for TilePos {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl From<IVec2> for TilePos {
    fn from(v: IVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<TilePos> for IVec2 {
    fn from(pos: TilePos) -> Self {
        IVec2::new(pos.x, pos.y)
    }
}

/// Opaque RGB color of a painted tile (no alpha is stored)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TileColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn channel(&self, channel: ColorChannel) -> u8 {
        match channel {
            ColorChannel::Red => self.r,
            ColorChannel::Green => self.g,
            ColorChannel::Blue => self.b,
        }
    }

    pub fn set_channel(&mut self, channel: ColorChannel, value: u8) {
        match channel {
            ColorChannel::Red => self.r = value,
            ColorChannel::Green => self.g = value,
            ColorChannel::Blue => self.b = value,
        }
    }
}

/// One of the three editable channels of the paint color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
}

impl From<(u8, u8, u8)> for TileColor {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl From<TileColor> for Color {
    fn from(color: TileColor) -> Self {
        Color::srgb_u8(color.r, color.g, color.b)
    }
}

/// A painted tile: the only value the store persists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRecord {
    pub pos: TilePos,
    pub color: TileColor,
}

impl TileRecord {
    pub const fn new(pos: TilePos, color: TileColor) -> Self {
        Self { pos, color }
    }
}
