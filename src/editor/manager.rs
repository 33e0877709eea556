use super::serialization::{CodecError, TileCodec};
use crate::tiles::{
    ColorChannel, StoreError, TileColor, TilePos, TileStore, TileStoreStats, AUTOSAVE_INTERVAL_SECS,
    DEFAULT_SAVE_PATH, PALETTE, TILE_SIZE,
};
use bevy::prelude::*;
use std::path::PathBuf;

/// Editor configuration
#[derive(Resource, Debug, Clone)]
pub struct EditorConfig {
    /// File loaded at startup and written on save
    pub save_path: PathBuf,
    /// Edge length of a tile in pixels
    pub tile_size: i32,
    /// Seconds between autosaves; 0 disables autosave
    pub autosave_secs: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from(DEFAULT_SAVE_PATH),
            tile_size: TILE_SIZE,
            autosave_secs: AUTOSAVE_INTERVAL_SECS,
        }
    }
}

/// Result of clicking a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileEdit {
    Painted(TilePos),
    Erased(TilePos),
}

/// Resource owning the painted tiles and their save state
#[derive(Resource)]
pub struct TileMapManager {
    pub store: TileStore,
    pub codec: TileCodec,
    pub save_path: PathBuf,

    /// Color used for newly painted tiles
    pub selected_color: TileColor,

    /// Channel of `selected_color` currently receiving typed digits
    pub editing_channel: Option<ColorChannel>,

    /// Set when the store differs from the file on disk
    pub dirty: bool,

    /// Cleared when the file on disk could not be read, so it is never overwritten
    pub can_save: bool,
}

impl TileMapManager {
    pub fn new(codec: TileCodec, save_path: PathBuf) -> Self {
        Self {
            store: TileStore::new(),
            codec,
            save_path,
            selected_color: PALETTE[0].into(),
            editing_channel: None,
            dirty: false,
            can_save: true,
        }
    }

    /// Load the tile map from `save_path`.
    /// A missing file is not an error: the editor starts with an empty map.
    pub fn load_or_empty(codec: TileCodec, save_path: PathBuf) -> Result<Self, CodecError> {
        let mut manager = Self::new(codec, save_path);
        match codec.load(&manager.save_path) {
            Ok(store) => {
                info!("Loaded {} tiles from {}", store.len(), manager.save_path.display());
                manager.store = store;
            }
            Err(e) if e.is_missing_file() => {
                info!("No tile file at {}, starting with an empty map", manager.save_path.display());
            }
            Err(e) => return Err(e),
        }
        Ok(manager)
    }

    /// Startup entry point: like `load_or_empty`, but an unreadable file leaves the
    /// editor empty with saving disabled so the file is kept intact
    pub fn open(codec: TileCodec, save_path: PathBuf) -> Self {
        match Self::load_or_empty(codec, save_path.clone()) {
            Ok(manager) => manager,
            Err(e) => {
                error!("Failed to load {}: {}, saving disabled", save_path.display(), e);
                let mut manager = Self::new(codec, save_path);
                manager.can_save = false;
                manager
            }
        }
    }

    /// Paint the tile if it is empty, erase it otherwise
    pub fn toggle_tile(&mut self, pos: TilePos) -> Result<TileEdit, StoreError> {
        let edit = if self.store.remove(pos) {
            TileEdit::Erased(pos)
        } else {
            self.store.insert(pos, self.selected_color)?;
            TileEdit::Painted(pos)
        };
        self.dirty = true;
        Ok(edit)
    }

    /// Erase every tile
    pub fn clear_tiles(&mut self) {
        if !self.store.is_empty() {
            self.store.clear();
            self.dirty = true;
        }
    }

    /// Select a palette entry by index. Returns false for an out-of-range index.
    pub fn select_palette(&mut self, index: usize) -> bool {
        match PALETTE.get(index) {
            Some(&rgb) => {
                self.selected_color = rgb.into();
                true
            }
            None => false,
        }
    }

    /// Step one channel of the paint color, clamped to 0..=255. Returns the new value.
    pub fn adjust_channel(&mut self, channel: ColorChannel, delta: i32) -> u8 {
        let current = i32::from(self.selected_color.channel(channel));
        let value = (current + delta).clamp(0, i32::from(u8::MAX)) as u8;
        self.selected_color.set_channel(channel, value);
        value
    }

    /// Append a decimal digit to one channel, clamped to 255. Returns the new value.
    pub fn type_channel_digit(&mut self, channel: ColorChannel, digit: u8) -> u8 {
        let current = u32::from(self.selected_color.channel(channel));
        let value = (current * 10 + u32::from(digit.min(9))).min(u32::from(u8::MAX)) as u8;
        self.selected_color.set_channel(channel, value);
        value
    }

    /// Drop the last decimal digit of one channel. Returns the new value.
    pub fn erase_channel_digit(&mut self, channel: ColorChannel) -> u8 {
        let value = self.selected_color.channel(channel) / 10;
        self.selected_color.set_channel(channel, value);
        value
    }

    /// True when there are edits that will not reach disk because saving is disabled
    pub fn save_blocked(&self) -> bool {
        self.dirty && !self.can_save
    }

    /// Write the store to `save_path` if it changed since the last save.
    /// Returns whether a file was written.
    pub fn save_if_dirty(&mut self) -> Result<bool, CodecError> {
        if !self.dirty || !self.can_save {
            return Ok(false);
        }
        self.codec.save(&self.store, &self.save_path)?;
        self.dirty = false;
        Ok(true)
    }

    pub fn stats(&self) -> TileStoreStats {
        self.store.stats()
    }
}
