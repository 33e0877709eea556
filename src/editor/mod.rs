pub mod manager;
pub mod serialization;
pub mod systems;

use bevy::prelude::*;
use manager::EditorConfig;

/// Plugin wiring the tile map into the app: load at startup, edit on input, save on exit
pub struct EditorPlugin;

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EditorConfig>()
            .add_message::<systems::TileSpriteUpdate>()
            .add_systems(Startup, (systems::setup_camera, systems::load_tile_map))
            .add_systems(
                Update,
                (
                    systems::edit_color,
                    systems::pan_camera,
                    systems::zoom_camera,
                    systems::paint_on_click,
                    systems::handle_shortcuts,
                    systems::autosave_tile_map,
                    systems::sync_tile_sprites
                        .after(systems::paint_on_click)
                        .after(systems::handle_shortcuts),
                ),
            )
            .add_systems(Last, systems::save_on_exit);
    }
}
