use bevy::prelude::*;

mod editor;
mod tiles;

use editor::EditorPlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Tile Painter".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EditorPlugin)
        .run();
}
