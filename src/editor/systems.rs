use super::manager::{EditorConfig, TileEdit, TileMapManager};
use super::serialization::TileCodec;
use crate::tiles::{
    ColorChannel, TilePos, TileRecord, PALETTE, PAN_SPEED, ZOOM_MAX, ZOOM_MIN, ZOOM_SPEED,
};
use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

/// Number keys selecting palette entries, in palette order
const PALETTE_KEYS: [KeyCode; PALETTE.len()] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
];

/// Keys selecting which channel of the paint color receives typed digits
const CHANNEL_KEYS: [(KeyCode, ColorChannel); 3] = [
    (KeyCode::KeyR, ColorChannel::Red),
    (KeyCode::KeyG, ColorChannel::Green),
    (KeyCode::KeyB, ColorChannel::Blue),
];

const DIGIT_KEYS: [KeyCode; 10] = [
    KeyCode::Digit0,
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

/// Sprite mirroring the painted tile at this position
#[derive(Component)]
pub struct TileSprite(pub TilePos);

/// Sprite work produced by map edits
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSpriteUpdate {
    /// A single tile was painted or erased
    Edit(TileEdit),
    /// The whole map was replaced (load, clear)
    Rebuild,
}

/// Repeating timer driving autosave
#[derive(Resource)]
pub struct AutosaveTimer(pub Timer);

pub fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

/// Load the tile file once at startup.
/// An unreadable file leaves the editor empty and disables saving so the file is kept intact.
pub fn load_tile_map(
    mut commands: Commands,
    config: Res<EditorConfig>,
    mut sprite_updates: MessageWriter<TileSpriteUpdate>,
) {
    let codec = match TileCodec::new(config.tile_size) {
        Ok(codec) => codec,
        Err(e) => {
            warn!("{}, falling back to the default tile size", e);
            TileCodec::default()
        }
    };

    commands.insert_resource(TileMapManager::open(codec, config.save_path.clone()));
    sprite_updates.write(TileSpriteUpdate::Rebuild);

    if config.autosave_secs > 0.0 {
        commands.insert_resource(AutosaveTimer(Timer::from_seconds(
            config.autosave_secs,
            TimerMode::Repeating,
        )));
    }
}

/// Toggle the tile under the cursor on left click
pub fn paint_on_click(
    mouse: Res<ButtonInput<MouseButton>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform), With<Camera2d>>,
    mut manager: ResMut<TileMapManager>,
    mut sprite_updates: MessageWriter<TileSpriteUpdate>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }

    let Ok(window) = window_query.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    let Ok(world_pos) = camera.viewport_to_world_2d(camera_transform, cursor) else {
        return;
    };

    let pos = TilePos::snap(world_pos, manager.codec.tile_size());
    match manager.toggle_tile(pos) {
        Ok(edit) => {
            debug!("{:?}", edit);
            sprite_updates.write(TileSpriteUpdate::Edit(edit));
        }
        Err(e) => error!("Failed to paint tile {:?}: {}", pos, e),
    }
}

/// Edit the paint color.
/// R, G or B starts typing into that channel: digits append, Backspace deletes a digit,
/// `[` and `]` step by one (ten with Shift), Enter or Escape finishes.
/// Outside channel typing the number keys pick a preset.
pub fn edit_color(keyboard: Res<ButtonInput<KeyCode>>, mut manager: ResMut<TileMapManager>) {
    if keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]) {
        return;
    }

    for (key, channel) in CHANNEL_KEYS {
        if keyboard.just_pressed(key) {
            manager.editing_channel = Some(channel);
            info!(
                "Editing {:?} channel ({})",
                channel,
                manager.selected_color.channel(channel)
            );
        }
    }

    let Some(channel) = manager.editing_channel else {
        for (index, key) in PALETTE_KEYS.iter().enumerate() {
            if keyboard.just_pressed(*key) && manager.select_palette(index) {
                info!("Selected color {:?}", manager.selected_color);
            }
        }
        return;
    };

    for (digit, key) in DIGIT_KEYS.iter().enumerate() {
        if keyboard.just_pressed(*key) {
            let value = manager.type_channel_digit(channel, digit as u8);
            debug!("{:?} channel = {}", channel, value);
        }
    }
    if keyboard.just_pressed(KeyCode::Backspace) {
        let value = manager.erase_channel_digit(channel);
        debug!("{:?} channel = {}", channel, value);
    }

    let step = if keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]) {
        10
    } else {
        1
    };
    if keyboard.just_pressed(KeyCode::BracketRight) {
        let value = manager.adjust_channel(channel, step);
        debug!("{:?} channel = {}", channel, value);
    }
    if keyboard.just_pressed(KeyCode::BracketLeft) {
        let value = manager.adjust_channel(channel, -step);
        debug!("{:?} channel = {}", channel, value);
    }

    if keyboard.any_just_pressed([KeyCode::Enter, KeyCode::Escape]) {
        manager.editing_channel = None;
        info!("Selected color {:?}", manager.selected_color);
    }
}

/// Pan the view with WASD or the arrow keys
pub fn pan_camera(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut camera_query: Query<&mut Transform, With<Camera2d>>,
) {
    // Ctrl+S saves rather than panning
    if keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]) {
        return;
    }

    if let Ok(mut transform) = camera_query.single_mut() {
        let delta = PAN_SPEED * time.delta_secs();

        if keyboard.pressed(KeyCode::KeyW) || keyboard.pressed(KeyCode::ArrowUp) {
            transform.translation.y += delta;
        }
        if keyboard.pressed(KeyCode::KeyS) || keyboard.pressed(KeyCode::ArrowDown) {
            transform.translation.y -= delta;
        }
        if keyboard.pressed(KeyCode::KeyA) || keyboard.pressed(KeyCode::ArrowLeft) {
            transform.translation.x -= delta;
        }
        if keyboard.pressed(KeyCode::KeyD) || keyboard.pressed(KeyCode::ArrowRight) {
            transform.translation.x += delta;
        }
    }
}

/// Zoom with the scroll wheel or the - and = keys
pub fn zoom_camera(
    mut scroll_events: MessageReader<MouseWheel>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut camera_query: Query<&mut Projection, With<Camera2d>>,
) {
    let mut zoom_delta = 0.0;
    for event in scroll_events.read() {
        zoom_delta -= event.y * ZOOM_SPEED;
    }
    if keyboard.just_pressed(KeyCode::Minus) {
        zoom_delta += ZOOM_SPEED;
    }
    if keyboard.just_pressed(KeyCode::Equal) {
        zoom_delta -= ZOOM_SPEED;
    }

    if zoom_delta == 0.0 {
        return;
    }
    let Ok(mut projection) = camera_query.single_mut() else {
        return;
    };
    if let Projection::Orthographic(ref mut ortho) = projection.as_mut() {
        ortho.scale = zoomed_scale(ortho.scale, zoom_delta);
    }
}

/// Apply a zoom step, keeping the camera scale within the zoom limits
pub fn zoomed_scale(scale: f32, delta: f32) -> f32 {
    (scale + delta).clamp(ZOOM_MIN, ZOOM_MAX)
}

/// Ctrl+S saves, Ctrl+Delete erases every tile
pub fn handle_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut manager: ResMut<TileMapManager>,
    mut sprite_updates: MessageWriter<TileSpriteUpdate>,
) {
    if !keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]) {
        return;
    }

    if keyboard.just_pressed(KeyCode::KeyS) {
        save_tile_map(&mut manager);
    }
    if keyboard.just_pressed(KeyCode::Delete) {
        let erased = manager.store.len();
        manager.clear_tiles();
        sprite_updates.write(TileSpriteUpdate::Rebuild);
        info!("Erased all {} tiles", erased);
    }
}

/// Periodically save a modified map
pub fn autosave_tile_map(
    time: Res<Time>,
    timer: Option<ResMut<AutosaveTimer>>,
    mut manager: ResMut<TileMapManager>,
) {
    let Some(mut timer) = timer else {
        return;
    };

    if timer.0.tick(time.delta()).just_finished() && manager.dirty {
        save_tile_map(&mut manager);
    }
}

/// Final save when the app is closing
pub fn save_on_exit(mut exit_events: MessageReader<AppExit>, mut manager: ResMut<TileMapManager>) {
    if exit_events.read().next().is_none() {
        return;
    }

    if manager.dirty {
        save_tile_map(&mut manager);
    }
}

/// Apply queued sprite updates; a rebuild supersedes single edits from the same frame
pub fn sync_tile_sprites(
    mut commands: Commands,
    mut updates: MessageReader<TileSpriteUpdate>,
    manager: Res<TileMapManager>,
    sprites: Query<(Entity, &TileSprite)>,
) {
    let updates: Vec<TileSpriteUpdate> = updates.read().copied().collect();
    if updates.is_empty() {
        return;
    }

    let tile_size = manager.codec.tile_size();
    if updates.contains(&TileSpriteUpdate::Rebuild) {
        for (entity, _) in sprites.iter() {
            commands.entity(entity).despawn();
        }
        for record in manager.store.iter() {
            spawn_tile_sprite(&mut commands, *record, tile_size);
        }
        return;
    }

    for update in updates {
        match update {
            TileSpriteUpdate::Edit(TileEdit::Painted(pos)) => {
                if let Some(record) = manager.store.get(pos) {
                    spawn_tile_sprite(&mut commands, record, tile_size);
                }
            }
            TileSpriteUpdate::Edit(TileEdit::Erased(pos)) => {
                for (entity, sprite) in sprites.iter() {
                    if sprite.0 == pos {
                        commands.entity(entity).despawn();
                    }
                }
            }
            TileSpriteUpdate::Rebuild => {}
        }
    }
}

fn spawn_tile_sprite(commands: &mut Commands, record: TileRecord, tile_size: i32) {
    let center = record.pos.to_world_center(tile_size);
    commands.spawn((
        TileSprite(record.pos),
        Sprite::from_color(record.color, Vec2::splat(tile_size as f32)),
        Transform::from_xyz(center.x, center.y, 0.0),
    ));
}

fn save_tile_map(manager: &mut TileMapManager) {
    if manager.save_blocked() {
        warn!(
            "Not saving to {}: the file could not be read at startup, edits are kept in memory only",
            manager.save_path.display()
        );
        return;
    }

    match manager.save_if_dirty() {
        Ok(true) => {
            info!("Saved tile map to {}", manager.save_path.display());
            debug!("Tile map stats: {}", manager.stats());
        }
        Ok(false) => {}
        Err(e) => error!("Failed to save tile map to {}: {}", manager.save_path.display(), e),
    }
}
