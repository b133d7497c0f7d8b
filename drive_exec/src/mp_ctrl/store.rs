//! Trajectory storage
//!
//! Paths are stored as two files, one per side of the chassis. Each file
//! contains the number of samples as a little endian `u32`, followed by every
//! sample's position, velocity and acceleration as little endian `f64`s, in
//! time order.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::convert::TryFrom;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::PathBuf;

// Internal
use crate::path_gen::{TrajectoryPair, TrajectorySegment};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default mount point of the storage device.
pub const STORAGE_ROOT: &str = "/usd";

/// Characters which can't appear in a file name on the storage device.
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '\\', '*', '|', '/'];

/// Upper bound on the capacity reserved up front when decoding, so a corrupt
/// count can't trigger a huge allocation before the stream runs out.
const MAX_PREALLOC_SAMPLES: usize = 1 << 16;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A side of the chassis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Side {
    Left,
    Right,
}

/// Errors which can occur while storing or loading a path.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Corrupt path data: the left side has {left} samples but the right side has {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Corrupt path data: the {0} stream has no sample count")]
    MissingCount(Side),

    #[error("Corrupt path data: the {side} stream ended after {read} of {expected} samples")]
    Truncated {
        side: Side,
        read: usize,
        expected: usize,
    },

    #[error("Path has too many samples to store ({0})")]
    TooLong(usize),

    #[error("Could not open path file {path:?}: {source}")]
    OpenError { path: PathBuf, source: io::Error },

    #[error("IO error while accessing path data: {0}")]
    IoError(io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

impl StoreError {
    /// True if the error comes from the content of the data rather than from
    /// accessing it.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            StoreError::LengthMismatch { .. }
                | StoreError::MissingCount(_)
                | StoreError::Truncated { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the path of a file on the storage device.
///
/// See [`make_file_path_in`].
pub fn make_file_path(directory: &str, filename: &str) -> String {
    make_file_path_in(STORAGE_ROOT, directory, filename)
}

/// Build the path of a file within `directory` under the storage `root`.
///
/// The directory always ends up under the root, with exactly one separator
/// between segments regardless of any leading or trailing separators given.
/// A leading segment with the same name as the root's last segment refers to
/// the root itself, so with a root of `/usd` both `usd/logs` and `logs` give
/// `/usd/logs`. Forbidden characters are removed from the file name.
pub fn make_file_path_in(root: &str, directory: &str, filename: &str) -> String {
    let root = root.trim_end_matches('/');
    let root_name = root.rsplit('/').next().unwrap_or("");

    let mut segments = directory.split('/').filter(|s| !s.is_empty()).peekable();
    if !root_name.is_empty() && segments.peek() == Some(&root_name) {
        segments.next();
    }

    let mut path = String::from(root);
    for seg in segments {
        path.push('/');
        path.push_str(seg);
    }

    path.push('/');
    path.extend(filename.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)));

    path
}

/// Write a trajectory into a pair of streams.
pub fn store_trajectory<L, R>(
    path: &TrajectoryPair,
    left: &mut L,
    right: &mut R,
) -> Result<(), StoreError>
where
    L: Write,
    R: Write,
{
    write_side(path.left(), left)?;
    write_side(path.right(), right)?;

    Ok(())
}

/// Read a trajectory from a pair of streams.
pub fn load_trajectory<L, R>(left: &mut L, right: &mut R) -> Result<TrajectoryPair, StoreError>
where
    L: Read,
    R: Read,
{
    let left_count = read_count(left, Side::Left)?;
    let right_count = read_count(right, Side::Right)?;

    if left_count != right_count {
        return Err(StoreError::LengthMismatch {
            left: left_count,
            right: right_count,
        });
    }

    let left_segs = read_side(left, Side::Left, left_count)?;
    let right_segs = read_side(right, Side::Right, right_count)?;

    TrajectoryPair::new(left_segs, right_segs).ok_or(StoreError::LengthMismatch {
        left: left_count,
        right: right_count,
    })
}

fn write_side<W: Write>(segs: &[TrajectorySegment], writer: &mut W) -> Result<(), StoreError> {
    let count = u32::try_from(segs.len()).map_err(|_| StoreError::TooLong(segs.len()))?;

    writer
        .write_u32::<LittleEndian>(count)
        .map_err(StoreError::IoError)?;

    for seg in segs {
        for value in [seg.position_m, seg.velocity_ms, seg.accel_mss].iter() {
            writer
                .write_f64::<LittleEndian>(*value)
                .map_err(StoreError::IoError)?;
        }
    }

    writer.flush().map_err(StoreError::IoError)
}

fn read_count<R: Read>(reader: &mut R, side: Side) -> Result<usize, StoreError> {
    match reader.read_u32::<LittleEndian>() {
        Ok(c) => Ok(c as usize),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(StoreError::MissingCount(side)),
        Err(e) => Err(StoreError::IoError(e)),
    }
}

fn read_side<R: Read>(
    reader: &mut R,
    side: Side,
    count: usize,
) -> Result<Vec<TrajectorySegment>, StoreError> {
    let mut segs = Vec::with_capacity(count.min(MAX_PREALLOC_SAMPLES));

    for read in 0..count {
        let seg = read_segment(reader).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => StoreError::Truncated {
                side,
                read,
                expected: count,
            },
            _ => StoreError::IoError(e),
        })?;
        segs.push(seg);
    }

    Ok(segs)
}

fn read_segment<R: Read>(reader: &mut R) -> io::Result<TrajectorySegment> {
    Ok(TrajectorySegment {
        position_m: reader.read_f64::<LittleEndian>()?,
        velocity_ms: reader.read_f64::<LittleEndian>()?,
        accel_mss: reader.read_f64::<LittleEndian>()?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn sample_pair() -> TrajectoryPair {
        let left = (0..25)
            .map(|i| TrajectorySegment::new(0.01 * i as f64, 0.1 * i as f64, 1.5))
            .collect();
        let right = (0..25)
            .map(|i| TrajectorySegment::new(0.02 * i as f64, 0.2 * i as f64, -1.0 / 3.0))
            .collect();
        TrajectoryPair::new(left, right).unwrap()
    }

    fn encode(pair: &TrajectoryPair) -> (Vec<u8>, Vec<u8>) {
        let (mut left, mut right) = (Vec::new(), Vec::new());
        store_trajectory(pair, &mut left, &mut right).unwrap();
        (left, right)
    }

    #[test]
    fn test_file_path_join() {
        for dir in ["", "/", "usd", "/usd", "usd/", "/usd/"].iter() {
            assert_eq!(make_file_path(dir, "test"), "/usd/test", "dir: {:?}", dir);
        }

        for dir in [
            "/usd/subdir",
            "usd/subdir",
            "/usd/subdir/",
            "usd/subdir/",
            "subdir",
            "/subdir",
            "subdir/",
            "/subdir/",
        ]
        .iter()
        {
            assert_eq!(
                make_file_path(dir, "test"),
                "/usd/subdir/test",
                "dir: {:?}",
                dir
            );
        }
    }

    #[test]
    fn test_file_path_restrict() {
        assert_eq!(make_file_path("", "t>e<s\"t\\F:i*l|e/"), "/usd/testFile");
    }

    #[test]
    fn test_file_path_other_root() {
        assert_eq!(
            make_file_path_in("/tmp/paths/", "/a//b/", "p.left.bin"),
            "/tmp/paths/a/b/p.left.bin"
        );
        assert_eq!(
            make_file_path_in("/tmp/paths", "paths", "p"),
            "/tmp/paths/p"
        );
    }

    #[test]
    fn test_encoded_layout() {
        let pair = TrajectoryPair::new(
            vec![TrajectorySegment::new(1.0, 2.0, 3.0)],
            vec![TrajectorySegment::new(4.0, 5.0, 6.0)],
        )
        .unwrap();
        let (left, right) = encode(&pair);

        assert_eq!(left.len(), 4 + 3 * 8);
        assert_eq!(right.len(), 4 + 3 * 8);
        assert_eq!(&left[..4], &[1, 0, 0, 0]);
        assert_eq!(&left[4..12], &1.0f64.to_le_bytes());
        assert_eq!(&right[20..28], &6.0f64.to_le_bytes());
    }

    #[test]
    fn test_round_trip() {
        let pair = sample_pair();
        let (left, right) = encode(&pair);

        let loaded = load_trajectory(&mut Cursor::new(left), &mut Cursor::new(right)).unwrap();

        assert_eq!(loaded.len(), pair.len());
        assert_eq!(loaded, pair);
    }

    #[test]
    fn test_empty_round_trip() {
        let (left, right) = encode(&TrajectoryPair::empty());
        let loaded = load_trajectory(&mut Cursor::new(left), &mut Cursor::new(right)).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_length_mismatch() {
        let (left, _) = encode(&sample_pair());
        let (right, _) = encode(
            &TrajectoryPair::new(
                vec![TrajectorySegment::default(); 3],
                vec![TrajectorySegment::default(); 3],
            )
            .unwrap(),
        );

        let err = load_trajectory(&mut Cursor::new(left), &mut Cursor::new(right)).unwrap_err();
        assert!(matches!(err, StoreError::LengthMismatch { left: 25, right: 3 }));
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_truncated_stream() {
        let (left, mut right) = encode(&sample_pair());

        // Chop the right stream part way through the 11th sample
        right.truncate(4 + 10 * 24 + 5);

        let err = load_trajectory(&mut Cursor::new(left), &mut Cursor::new(right)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Truncated {
                side: Side::Right,
                read: 10,
                expected: 25
            }
        ));
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_missing_count() {
        let (left, _) = encode(&sample_pair());

        let err = load_trajectory(&mut Cursor::new(left), &mut Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, StoreError::MissingCount(Side::Right)));
    }
}
