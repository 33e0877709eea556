/// Number of hash buckets in a tile store (fixed for the store's lifetime)
pub const BUCKET_COUNT: usize = 5000;

/// Knuth multiplicative constant applied to the x coordinate
pub const HASH_X_MULTIPLIER: u32 = 2_654_435_761;

/// Knuth multiplicative constant applied to the y coordinate
pub const HASH_Y_MULTIPLIER: u32 = 2_246_822_519;

/// Edge length of a painted tile, in the same pixel units as tile coordinates
pub const TILE_SIZE: i32 = 50;

/// File the editor loads at startup and saves at shutdown
pub const DEFAULT_SAVE_PATH: &str = "Demo.obj";

/// Seconds between autosaves of a modified tile map
pub const AUTOSAVE_INTERVAL_SECS: f32 = 30.0;

/// Camera pan speed in pixels per second
pub const PAN_SPEED: f32 = 400.0;

/// Smallest camera scale (most zoomed in)
pub const ZOOM_MIN: f32 = 0.25;

/// Largest camera scale (most zoomed out)
pub const ZOOM_MAX: f32 = 4.0;

/// Camera scale change per scroll step or zoom key press
pub const ZOOM_SPEED: f32 = 0.1;

// Preset paint colors (r, g, b); any channel can also be typed in
pub const REDDISH: (u8, u8, u8) = (255, 128, 128);
pub const GREENISH: (u8, u8, u8) = (128, 255, 128);
pub const BLUEISH: (u8, u8, u8) = (128, 128, 255);
pub const DARK_REDDISH: (u8, u8, u8) = (155, 28, 28);
pub const DARK_GREENISH: (u8, u8, u8) = (28, 155, 28);
pub const DARK_BLUEISH: (u8, u8, u8) = (28, 28, 155);
pub const BLACKISH: (u8, u8, u8) = (50, 50, 50);
pub const WHITISH: (u8, u8, u8) = (200, 200, 200);

/// Palette in number-key order (1-8)
pub const PALETTE: [(u8, u8, u8); 8] = [
    REDDISH,
    GREENISH,
    BLUEISH,
    DARK_REDDISH,
    DARK_GREENISH,
    DARK_BLUEISH,
    BLACKISH,
    WHITISH,
];
