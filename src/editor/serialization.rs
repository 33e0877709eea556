//! Text codec for tile maps.
//!
//! Every tile is written as a unit quad mesh fragment, preceded by a blank line:
//!
//! ```text
//!
//! v <x> <y> <r> <g> <b>
//! v <x+T> <y> <r> <g> <b>
//! v <x> <y+T> <r> <g> <b>
//! v <x+T> <y+T> <r> <g> <b>
//! i <n> <n+1> <n+3>
//! i <n> <n+2> <n+3>
//! ```
//!
//! Only the first vertex line of a block is read back. The other lines exist
//! for mesh consumers and are skipped without validation.

use crate::tiles::{StoreError, TileColor, TilePos, TileStore, TILE_SIZE};
use bevy::log::{debug, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Longest line the reader buffers. A vertex line needs at most 38 bytes.
const MAX_LINE_LEN: usize = 64;

const VERTEX_TAG: &[u8] = b"v ";

/// Fields on a vertex line: x, y, r, g, b
const FIELDS_PER_VERTEX: usize = 5;

const VERTICES_PER_TILE: usize = 4;
const INDEX_LINES_PER_TILE: usize = 2;

/// Lines written per tile, not counting the blank separator
pub const LINES_PER_TILE: usize = VERTICES_PER_TILE + INDEX_LINES_PER_TILE;

/// Lines discarded after each authoritative vertex line: the rest of the
/// block plus the separator in front of the next one
pub const LINES_TO_SKIP: usize = LINES_PER_TILE - 1 + 1;

/// What was wrong with a line of a tile file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatErrorKind {
    TokenCount(usize),
    InvalidNumber(String),
    TruncatedLine,
}

impl std::fmt::Display for FormatErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatErrorKind::TokenCount(n) => {
                write!(f, "expected {} fields, found {}", FIELDS_PER_VERTEX, n)
            }
            FormatErrorKind::InvalidNumber(token) => write!(f, "invalid number {:?}", token),
            FormatErrorKind::TruncatedLine => {
                write!(f, "line longer than {} bytes", MAX_LINE_LEN)
            }
        }
    }
}

/// Error type for tile file operations
#[derive(Debug)]
pub enum CodecError {
    InvalidArgument(&'static str),
    Path { path: PathBuf, source: io::Error },
    Io(io::Error),
    Format { line: usize, kind: FormatErrorKind },
    Store(StoreError),
}

impl CodecError {
    /// True when the file simply does not exist yet
    pub fn is_missing_file(&self) -> bool {
        matches!(self, CodecError::Path { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        CodecError::Io(err)
    }
}

impl From<StoreError> for CodecError {
    fn from(err: StoreError) -> Self {
        CodecError::Store(err)
    }
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CodecError::Path { path, source } => {
                write!(f, "Cannot open {}: {}", path.display(), source)
            }
            CodecError::Io(e) => write!(f, "IO error: {}", e),
            CodecError::Format { line, kind } => write!(f, "Malformed line {}: {}", line, kind),
            CodecError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Path { source, .. } => Some(source),
            CodecError::Io(e) => Some(e),
            CodecError::Store(e) => Some(e),
            CodecError::InvalidArgument(_) | CodecError::Format { .. } => None,
        }
    }
}

/// Reads and writes tile stores in the vertex/index text format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCodec {
    tile_size: i32,
}

impl TileCodec {
    pub fn new(tile_size: i32) -> Result<Self, CodecError> {
        if tile_size <= 0 {
            return Err(CodecError::InvalidArgument("tile size must be positive"));
        }
        Ok(Self { tile_size })
    }

    pub fn tile_size(&self) -> i32 {
        self.tile_size
    }

    /// Save a store to disk, truncating any existing file
    pub fn save<P: AsRef<Path>>(&self, store: &TileStore, path: P) -> Result<(), CodecError> {
        let path = check_path(path.as_ref())?;
        let file = File::create(path).map_err(|source| CodecError::Path {
            path: path.to_path_buf(),
            source,
        })?;

        let mut writer = BufWriter::new(file);
        let count = self.write_to(store, &mut writer)?;
        writer.flush()?;

        debug!("Saved {} tiles to {}", count, path.display());
        Ok(())
    }

    /// Write every record of a store. Returns the number of tiles written.
    pub fn write_to<W: Write>(&self, store: &TileStore, mut writer: W) -> Result<usize, CodecError> {
        let mut base: u64 = 0;

        for record in store.iter() {
            let TilePos { x, y } = record.pos;
            let TileColor { r, g, b } = record.color;
            // Corner coordinates are write-only, so overflow wraps
            let right = x.wrapping_add(self.tile_size);
            let bottom = y.wrapping_add(self.tile_size);

            write!(writer, "\nv {} {} {} {} {}\n", x, y, r, g, b)?;
            writeln!(writer, "v {} {} {} {} {}", right, y, r, g, b)?;
            writeln!(writer, "v {} {} {} {} {}", x, bottom, r, g, b)?;
            writeln!(writer, "v {} {} {} {} {}", right, bottom, r, g, b)?;
            writeln!(writer, "i {} {} {}", base, base + 1, base + 3)?;
            writeln!(writer, "i {} {} {}", base, base + 2, base + 3)?;

            base += VERTICES_PER_TILE as u64;
        }

        Ok(store.len())
    }

    /// Load a store from disk. Any malformed vertex line fails the whole load.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<TileStore, CodecError> {
        let path = check_path(path.as_ref())?;
        let file = File::open(path).map_err(|source| CodecError::Path {
            path: path.to_path_buf(),
            source,
        })?;

        let store = self.read_from(BufReader::new(file))?;
        debug!("Loaded {} tiles from {}", store.len(), path.display());
        Ok(store)
    }

    /// Rebuild a store from the first vertex line of every tile block
    pub fn read_from<R: BufRead>(&self, mut reader: R) -> Result<TileStore, CodecError> {
        let mut store = TileStore::try_new()?;
        let mut line = Vec::with_capacity(MAX_LINE_LEN);
        let mut line_number = 0;

        loop {
            let status = read_bounded_line(&mut reader, &mut line)?;
            if status == LineStatus::Eof {
                break;
            }
            line_number += 1;

            if !line.starts_with(VERTEX_TAG) {
                if status == LineStatus::Overflow {
                    discard_line(&mut reader)?;
                }
                continue;
            }

            let parsed = if status == LineStatus::Overflow {
                Err(FormatErrorKind::TruncatedLine)
            } else {
                parse_vertex_line(&line)
            };
            let (pos, color) = parsed.map_err(|kind| {
                warn!("Rejecting tile file at line {}: {}", line_number, kind);
                CodecError::Format {
                    line: line_number,
                    kind,
                }
            })?;
            store.insert(pos, color)?;

            for _ in 0..LINES_TO_SKIP {
                if !discard_line(&mut reader)? {
                    break;
                }
                line_number += 1;
            }
        }

        Ok(store)
    }
}

impl Default for TileCodec {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
        }
    }
}

fn check_path(path: &Path) -> Result<&Path, CodecError> {
    if path.as_os_str().is_empty() {
        return Err(CodecError::InvalidArgument("empty file path"));
    }
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineStatus {
    Complete,
    Overflow,
    Eof,
}

/// Read one line of at most MAX_LINE_LEN bytes into `line`.
/// A final line without a newline counts as complete.
fn read_bounded_line<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<LineStatus> {
    line.clear();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', line)?;

    if read == 0 {
        return Ok(LineStatus::Eof);
    }
    if line.last() == Some(&b'\n') || read < MAX_LINE_LEN || reader.fill_buf()?.is_empty() {
        return Ok(LineStatus::Complete);
    }
    Ok(LineStatus::Overflow)
}

/// Consume input up to and including the next newline without buffering it.
/// Returns false if already at end of input.
fn discard_line<R: BufRead>(reader: &mut R) -> io::Result<bool> {
    let mut consumed = false;

    loop {
        let (found_newline, used) = {
            let available = match reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(consumed);
            }
            match available.iter().position(|&byte| byte == b'\n') {
                Some(i) => (true, i + 1),
                None => (false, available.len()),
            }
        };

        reader.consume(used);
        consumed = true;
        if found_newline {
            return Ok(true);
        }
    }
}

fn parse_vertex_line(line: &[u8]) -> Result<(TilePos, TileColor), FormatErrorKind> {
    let body = &line[VERTEX_TAG.len()..];
    let text = std::str::from_utf8(body)
        .map_err(|_| FormatErrorKind::InvalidNumber(String::from_utf8_lossy(body).into_owned()))?;

    let tokens: Vec<&str> = text.split_ascii_whitespace().collect();
    if tokens.len() != FIELDS_PER_VERTEX {
        return Err(FormatErrorKind::TokenCount(tokens.len()));
    }

    let pos = TilePos::new(parse_field(tokens[0])?, parse_field(tokens[1])?);
    let color = TileColor::new(
        parse_field(tokens[2])?,
        parse_field(tokens[3])?,
        parse_field(tokens[4])?,
    );
    Ok((pos, color))
}

fn parse_field<T: std::str::FromStr>(token: &str) -> Result<T, FormatErrorKind> {
    token
        .parse()
        .map_err(|_| FormatErrorKind::InvalidNumber(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::io::Cursor;

    const RED: TileColor = TileColor::new(255, 0, 0);
    const GREEN: TileColor = TileColor::new(0, 255, 0);
    const BLUE: TileColor = TileColor::new(0, 0, 255);

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("tile_painter_{}_{}.obj", std::process::id(), name))
    }

    fn sample_store() -> TileStore {
        let mut store = TileStore::new();
        store.insert(TilePos::new(0, 0), RED).unwrap();
        store.insert(TilePos::new(50, 0), GREEN).unwrap();
        store.insert(TilePos::new(0, 50), BLUE).unwrap();
        store
    }

    fn read_str(input: &str) -> Result<TileStore, CodecError> {
        TileCodec::default().read_from(Cursor::new(input.as_bytes()))
    }

    #[test]
    fn test_save_and_load_tiles() {
        let path = temp_path("save_and_load");
        let codec = TileCodec::default();

        codec.save(&sample_store(), &path).expect("Failed to save tiles");
        let mut loaded = codec.load(&path).expect("Failed to load tiles");

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(TilePos::new(0, 0)).map(|r| r.color), Some(RED));
        assert_eq!(loaded.get(TilePos::new(50, 0)).map(|r| r.color), Some(GREEN));
        assert_eq!(loaded.get(TilePos::new(0, 50)).map(|r| r.color), Some(BLUE));
        assert_eq!(loaded.get(TilePos::new(50, 50)), None);

        assert!(loaded.remove(TilePos::new(50, 0)));
        assert_eq!(loaded.get(TilePos::new(50, 0)), None);
        assert_eq!(loaded.len(), 2);

        // Cleanup
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_written_format() {
        let mut store = TileStore::new();
        store.insert(TilePos::new(0, 0), RED).unwrap();
        // (50, 0) lands in a later bucket, so it is written second
        store.insert(TilePos::new(50, 0), TileColor::new(1, 2, 3)).unwrap();

        let mut out = Vec::new();
        let count = TileCodec::default().write_to(&store, &mut out).unwrap();
        assert_eq!(count, 2);

        let expected = "\nv 0 0 255 0 0\n\
                        v 50 0 255 0 0\n\
                        v 0 50 255 0 0\n\
                        v 50 50 255 0 0\n\
                        i 0 1 3\n\
                        i 0 2 3\n\
                        \nv 50 0 1 2 3\n\
                        v 100 0 1 2 3\n\
                        v 50 50 1 2 3\n\
                        v 100 50 1 2 3\n\
                        i 4 5 7\n\
                        i 4 6 7\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_tile_size_scales_corners() {
        let mut store = TileStore::new();
        store.insert(TilePos::new(-8, 16), GREEN).unwrap();

        let mut out = Vec::new();
        TileCodec::new(8).unwrap().write_to(&store, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("v 0 24 0 255 0\n"));
        assert_eq!(TileCodec::new(8).unwrap().tile_size(), 8);
    }

    #[test]
    fn test_skip_count_matches_writer() {
        let mut out = Vec::new();
        TileCodec::default().write_to(&sample_store(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3 * (LINES_PER_TILE + 1));

        // Authoritative lines are the first vertex line after each separator
        let authoritative: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(i, line)| line.starts_with("v ") && *i > 0 && lines[i - 1].is_empty())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(authoritative.len(), 3);
        for pair in authoritative.windows(2) {
            assert_eq!(pair[1] - pair[0] - 1, LINES_TO_SKIP);
        }
    }

    #[test]
    fn test_round_trip_many_tiles() {
        let mut store = TileStore::new();
        for i in -20..20 {
            for j in -10..10 {
                let color = TileColor::new((i + 20) as u8, (j + 10) as u8, ((i * j) & 0xff) as u8);
                store.insert(TilePos::new(i * 50, j * 50), color).unwrap();
            }
        }
        // Colliding positions share bucket 0
        store.insert(TilePos::new(2593, 0), RED).unwrap();
        store.insert(TilePos::new(4698, 0), BLUE).unwrap();
        store.insert(TilePos::new(i32::MAX, i32::MIN), GREEN).unwrap();

        let codec = TileCodec::default();
        let mut out = Vec::new();
        codec.write_to(&store, &mut out).unwrap();
        let loaded = codec.read_from(Cursor::new(out)).unwrap();

        assert_eq!(loaded.len(), store.len());
        for record in store.iter() {
            assert_eq!(loaded.get(record.pos), Some(*record));
        }
    }

    #[test]
    fn test_empty_store_round_trip() {
        let mut out = Vec::new();
        TileCodec::default().write_to(&TileStore::new(), &mut out).unwrap();
        assert!(out.is_empty());

        let loaded = read_str("").unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_rejects_wrong_token_count() {
        let err = read_str("\nv 10 20 255 0\n").unwrap_err();
        match err {
            CodecError::Format { line, kind } => {
                assert_eq!(line, 2);
                assert_eq!(kind, FormatErrorKind::TokenCount(4));
            }
            other => panic!("unexpected error: {}", other),
        }

        let err = read_str("v 1 2 3 4 5 6\n").unwrap_err();
        assert!(matches!(
            err,
            CodecError::Format {
                kind: FormatErrorKind::TokenCount(6),
                ..
            }
        ));
    }

    #[test]
    fn test_load_rejects_non_numeric_token() {
        let err = read_str("v 10 20 abc 0 0\n").unwrap_err();
        match err {
            CodecError::Format { line, kind } => {
                assert_eq!(line, 1);
                assert_eq!(kind, FormatErrorKind::InvalidNumber("abc".to_string()));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_load_rejects_color_out_of_range() {
        let err = read_str("v 0 0 256 0 0\n").unwrap_err();
        assert!(matches!(
            err,
            CodecError::Format {
                kind: FormatErrorKind::InvalidNumber(_),
                ..
            }
        ));
    }

    #[test]
    fn test_bad_record_after_good_ones_fails_whole_load() {
        let mut out = Vec::new();
        TileCodec::default().write_to(&sample_store(), &mut out).unwrap();
        out.extend_from_slice(b"\nv 100 100 1 2\n");

        let err = TileCodec::default().read_from(Cursor::new(out)).unwrap_err();
        match err {
            CodecError::Format { line, .. } => assert_eq!(line, 3 * (LINES_PER_TILE + 1) + 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_load_ignores_non_vertex_lines() {
        let input = "# exported by hand\nhello\n\nvn 1 2 3\nv 0 0 1 2 3\n";
        let loaded = read_str(input).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get(TilePos::new(0, 0)).map(|r| r.color),
            Some(TileColor::new(1, 2, 3))
        );
    }

    #[test]
    fn test_skipped_lines_are_not_validated() {
        let input = "\nv 0 0 1 2 3\nv garbage\nzzz\n\n\nfoo\nbar\nv 50 0 4 5 6\n";
        let loaded = read_str(input).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get(TilePos::new(50, 0)).map(|r| r.color),
            Some(TileColor::new(4, 5, 6))
        );
    }

    #[test]
    fn test_last_line_without_newline() {
        let loaded = read_str("\nv -50 100 9 8 7").unwrap();
        assert_eq!(
            loaded.get(TilePos::new(-50, 100)).map(|r| r.color),
            Some(TileColor::new(9, 8, 7))
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let loaded = read_str("\r\nv 0 0 1 2 3\r\n").unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_load_rejects_invalid_utf8_vertex_line() {
        let input: &[u8] = b"\nv 0 0 \xFF 0 0\n";
        let err = TileCodec::default().read_from(input).unwrap_err();
        match err {
            CodecError::Format {
                line: 2,
                kind: FormatErrorKind::InvalidNumber(token),
            } => assert!(token.contains('\u{FFFD}')),
            other => panic!("Expected an invalid number on line 2, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_outside_vertex_lines_is_ignored() {
        let input: &[u8] = b"\xFF\xFE garbage\n\nv 0 0 1 2 3\n";
        let loaded = TileCodec::default().read_from(input).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_overlong_garbage_line_is_ignored() {
        let input = format!("{}\nv 0 0 1 2 3\n", "x".repeat(MAX_LINE_LEN * 4));
        let loaded = read_str(&input).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains(TilePos::new(0, 0)));
    }

    #[test]
    fn test_overlong_vertex_line_is_rejected() {
        let input = format!("v 1 2 3 4 5{}\n", " 0".repeat(MAX_LINE_LEN));
        let err = read_str(&input).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Format {
                line: 1,
                kind: FormatErrorKind::TruncatedLine,
            }
        ));
    }

    #[test]
    fn test_duplicate_positions_in_file_keep_last() {
        let input = "\nv 0 0 1 1 1\n\nv 0 0 2 2 2\n";
        // The skip swallows the second block entirely
        let loaded = read_str(input).unwrap();
        assert_eq!(loaded.len(), 1);

        let input = "\nv 0 0 1 1 1\n.\n.\n.\n.\n.\n\nv 0 0 2 2 2\n";
        let loaded = read_str(input).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get(TilePos::new(0, 0)).map(|r| r.color),
            Some(TileColor::new(2, 2, 2))
        );
    }

    #[test]
    fn test_missing_file_is_path_error() {
        let path = temp_path("does_not_exist");
        let _ = fs::remove_file(&path);
        assert!(!path.exists());

        let err = TileCodec::default().load(&path).unwrap_err();
        assert!(err.is_missing_file());
        assert!(matches!(err, CodecError::Path { .. }));
    }

    #[test]
    fn test_format_error_is_not_missing_file() {
        let err = read_str("v x\n").unwrap_err();
        assert!(!err.is_missing_file());
    }

    #[test]
    fn test_save_to_unopenable_path() {
        let path = env::temp_dir()
            .join(format!("tile_painter_missing_dir_{}", std::process::id()))
            .join("tiles.obj");

        let err = TileCodec::default().save(&sample_store(), &path).unwrap_err();
        assert!(matches!(err, CodecError::Path { .. }));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(TileCodec::new(0), Err(CodecError::InvalidArgument(_))));
        assert!(matches!(TileCodec::new(-50), Err(CodecError::InvalidArgument(_))));

        let codec = TileCodec::default();
        assert!(matches!(codec.load(""), Err(CodecError::InvalidArgument(_))));
        assert!(matches!(
            codec.save(&TileStore::new(), ""),
            Err(CodecError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_save_truncates_existing_file() {
        let path = temp_path("truncate");
        let codec = TileCodec::default();

        codec.save(&sample_store(), &path).unwrap();
        let mut single = TileStore::new();
        single.insert(TilePos::new(500, 500), RED).unwrap();
        codec.save(&single, &path).unwrap();

        let loaded = codec.load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains(TilePos::new(500, 500)));

        // Cleanup
        let _ = fs::remove_file(path);
    }
}
