//! Recorded capture sessions.
//!
//! A recording directory holds the encoded keyframe images plus a
//! `frames.csv` index, one row per observation:
//!
//! ```text
//! # timestamp_ns, filename, width, height, fx, fy, cx, cy, px, py, pz, qx, qy, qz, qw
//! 1700000000000, frame_0.jpg, 640, 480, 432.5, 432.5, 321.1, 240.8, 0, 1.6, 0, 0, 0, 0, 1
//! ```
//!
//! [`RecordedCaptureDevice`] replays it through the [`CaptureDevice`]
//! interface so the whole pipeline can run without a camera.
//! [`RecordingWriter`] produces the same layout from accepted keyframes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, Writer};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use tracing::{debug, warn};

use crate::capture::{CaptureDevice, Extrinsics, Frame, Intrinsics};

/// Name of the index file inside a recording directory.
pub const INDEX_FILE: &str = "frames.csv";

/// Number of columns in an index row.
const INDEX_COLUMNS: usize = 15;

const INDEX_HEADER: [&str; INDEX_COLUMNS] = [
    "# timestamp_ns",
    "filename",
    "width",
    "height",
    "fx",
    "fy",
    "cx",
    "cy",
    "px",
    "py",
    "pz",
    "qx",
    "qy",
    "qz",
    "qw",
];

#[derive(Debug, Clone)]
pub struct RecordingEntry {
    pub timestamp_ns: u64,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub intrinsics: Intrinsics,
    pub extrinsics: Extrinsics,
}

#[derive(Debug)]
pub struct Recording {
    root: PathBuf,
    pub entries: Vec<RecordingEntry>,
}

impl Recording {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let entries = load_index(root.join(INDEX_FILE))?;
        if entries.is_empty() {
            bail!("recording {} has no frames", root.display());
        }
        Ok(Self { root, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load the encoded image of one entry.
    ///
    /// An unreadable image yields an empty frame, which the capture loop
    /// skips like any other unavailable observation.
    pub fn frame(&self, idx: usize) -> Frame {
        let Some(entry) = self.entries.get(idx) else {
            return Frame::empty();
        };
        let path = self.root.join(&entry.filename);
        match fs::read(&path) {
            Ok(image) => Frame::new(image, entry.width, entry.height),
            Err(e) => {
                warn!("Could not read {}: {}. Skipping frame.", path.display(), e);
                Frame::empty()
            }
        }
    }
}

/// Replays a [`Recording`] one entry per [`RecordedCaptureDevice::advance`].
pub struct RecordedCaptureDevice {
    recording: Recording,
    cursor: usize,
}

impl RecordedCaptureDevice {
    pub fn new(recording: Recording) -> Self {
        Self {
            recording,
            cursor: 0,
        }
    }

    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self::new(Recording::open(root)?))
    }

    /// Move to the next observation. Returns false once the recording is
    /// exhausted; the device keeps reporting the last entry afterwards.
    pub fn advance(&mut self) -> bool {
        if self.cursor + 1 >= self.recording.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.recording.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recording.is_empty()
    }

    fn current(&self) -> &RecordingEntry {
        &self.recording.entries[self.cursor]
    }
}

impl CaptureDevice for RecordedCaptureDevice {
    fn intrinsics(&mut self) -> Intrinsics {
        self.current().intrinsics
    }

    fn extrinsics(&mut self) -> Extrinsics {
        self.current().extrinsics
    }

    fn frame(&mut self) -> Frame {
        self.recording.frame(self.cursor)
    }
}

/// Writes keyframes into a recording directory.
///
/// Each accepted observation becomes one image file plus one index row.
/// The index is flushed after every row, so a recording cut short is still
/// readable up to the last keyframe.
pub struct RecordingWriter {
    root: PathBuf,
    index: Writer<fs::File>,
    written: usize,
}

impl RecordingWriter {
    /// Create `root` if needed and start a fresh index in it.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create recording dir {}", root.display()))?;

        let index_path = root.join(INDEX_FILE);
        let mut index = Writer::from_path(&index_path)
            .with_context(|| format!("Failed to create {}", index_path.display()))?;
        index.write_record(INDEX_HEADER)?;
        index.flush()?;

        Ok(Self {
            root,
            index,
            written: 0,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keyframes written so far.
    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Append one keyframe. Unavailable frames are not written; returns
    /// whether a row was added.
    pub fn append(
        &mut self,
        timestamp_ns: u64,
        intrinsics: &Intrinsics,
        extrinsics: &Extrinsics,
        frame: &Frame,
    ) -> Result<bool> {
        if !frame.is_available() {
            return Ok(false);
        }

        let filename = format!("frame_{:05}.img", self.written);
        let path = self.root.join(&filename);
        fs::write(&path, &frame.image)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let [qx, qy, qz, qw] = extrinsics.rotation_xyzw();
        let p = &extrinsics.position;
        let mut row = vec![
            timestamp_ns.to_string(),
            filename,
            frame.width.to_string(),
            frame.height.to_string(),
        ];
        row.extend(
            [
                intrinsics.focal_length.x,
                intrinsics.focal_length.y,
                intrinsics.principal_point.x,
                intrinsics.principal_point.y,
                p.x,
                p.y,
                p.z,
                qx,
                qy,
                qz,
                qw,
            ]
            .iter()
            .map(f32::to_string),
        );
        self.index.write_record(&row)?;
        self.index.flush()?;

        self.written += 1;
        debug!("Recorded keyframe {} to {}", self.written, self.root.display());
        Ok(true)
    }
}

fn load_index(csv_path: PathBuf) -> Result<Vec<RecordingEntry>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut entries = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        if rec.len() < INDEX_COLUMNS {
            warn!(
                "{}: row {} has {} columns, expected {}",
                csv_path.display(),
                line,
                rec.len(),
                INDEX_COLUMNS
            );
            continue;
        }
        let float = |i: usize| -> Result<f32> {
            rec[i]
                .parse::<f32>()
                .with_context(|| format!("row {}: bad number {:?} in column {}", line, &rec[i], i))
        };

        let intrinsics = Intrinsics::new(float(4)?, float(5)?, float(6)?, float(7)?);
        // Recorded rotations come from text; renormalize what was rounded.
        let rotation = UnitQuaternion::new_normalize(Quaternion::new(
            float(14)?,
            float(11)?,
            float(12)?,
            float(13)?,
        ));
        let extrinsics = Extrinsics::new(Vector3::new(float(8)?, float(9)?, float(10)?), rotation);

        entries.push(RecordingEntry {
            timestamp_ns: rec[0].parse()?,
            filename: rec[1].to_string(),
            width: rec[2].parse()?,
            height: rec[3].parse()?,
            intrinsics,
            extrinsics,
        });
    }
    Ok(entries)
}
