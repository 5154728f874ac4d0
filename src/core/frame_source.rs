use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::num::NonZeroU64;
use std::path::Path;

use serde::Serialize;

use super::error::FrameError;
use super::format::FrameGeometry;
use crate::utils::logger;

/// 1-based frame position. Frame 1 starts at byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameIndex(NonZeroU64);

impl FrameIndex {
    pub const FIRST: FrameIndex = FrameIndex(NonZeroU64::MIN);

    pub fn new(index: u64) -> Option<Self> {
        NonZeroU64::new(index).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The previous index, or `None` at frame 1.
    pub fn prev(self) -> Option<Self> {
        Self::new(self.get() - 1)
    }

    /// Absolute byte offset of this frame's first byte.
    pub fn byte_offset(self, frame_size: usize) -> Option<u64> {
        (self.get() - 1).checked_mul(frame_size as u64)
    }
}

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How much of a stream is made of whole frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameCount {
    pub frames: u64,
    pub trailing_bytes: u64,
}

/// Random access to the fixed-size frames of a headerless stream.
///
/// The displayed frame lives in `frame`. Reads land in `scratch` first and are
/// swapped in only once a whole frame has arrived.
pub struct FrameSource<R> {
    stream: Option<R>,
    geometry: FrameGeometry,
    frame: Vec<u8>,
    scratch: Vec<u8>,
    // Last known stream position; `None` forces a seek.
    position: Option<u64>,
}

impl FrameSource<File> {
    pub fn open(path: impl AsRef<Path>, geometry: FrameGeometry) -> Result<Self, FrameError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| FrameError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        logger::info(&format!(
            "Opened {} ({} bytes per frame)",
            path.display(),
            geometry.frame_size()
        ));

        let mut source = Self::from_stream(file, geometry);
        source.position = Some(0);
        Ok(source)
    }
}

impl<R: Read + Seek> FrameSource<R> {
    pub fn from_stream(stream: R, geometry: FrameGeometry) -> Self {
        let frame_size = geometry.frame_size();
        Self {
            stream: Some(stream),
            geometry,
            frame: vec![0u8; frame_size],
            scratch: vec![0u8; frame_size],
            position: None,
        }
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// The last frame read successfully (zeroes before the first read).
    #[cfg(test)]
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Reads frame `index` into the frame buffer.
    ///
    /// On failure the buffer keeps the previous frame.
    pub fn read_at(&mut self, index: FrameIndex) -> Result<&[u8], FrameError> {
        let frame_size = self.geometry.frame_size();
        let end_of_stream = FrameError::EndOfStream { index };

        let Some(offset) = index.byte_offset(frame_size) else {
            return Err(end_of_stream);
        };
        let Some(stream) = self.stream.as_mut() else {
            logger::debug(&format!("read of frame {} on a closed source", index));
            return Err(end_of_stream);
        };

        if self.position != Some(offset) {
            if let Err(e) = stream.seek(SeekFrom::Start(offset)) {
                logger::warn(&format!("seek to byte {} failed: {}", offset, e));
                self.position = None;
                return Err(end_of_stream);
            }
            self.position = Some(offset);
        }

        let filled = match read_full(stream, &mut self.scratch) {
            Ok(n) => n,
            Err(e) => {
                logger::warn(&format!("read of frame {} failed: {}", index, e));
                self.position = None;
                return Err(end_of_stream);
            }
        };
        self.position = Some(offset + filled as u64);

        if filled < frame_size {
            logger::debug(&format!(
                "frame {}: got {} of {} bytes",
                index, filled, frame_size
            ));
            return Err(end_of_stream);
        }

        std::mem::swap(&mut self.frame, &mut self.scratch);
        Ok(&self.frame)
    }

    /// Counts the complete frames in the stream.
    pub fn frame_count(&mut self) -> io::Result<FrameCount> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "frame source is closed"))?;
        let len = stream.seek(SeekFrom::End(0))?;
        self.position = Some(len);

        let frame_size = self.geometry.frame_size() as u64;
        Ok(FrameCount {
            frames: len / frame_size,
            trailing_bytes: len % frame_size,
        })
    }

    /// Releases the stream. Safe to call more than once.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            self.position = None;
            logger::debug("Frame source closed");
        }
    }
}

// Reads until `buf` is full or the stream ends, returning the byte count.
fn read_full<R: Read>(stream: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::format::PixelFormat;
    use std::io::{Cursor, Write};

    fn geometry() -> FrameGeometry {
        // 4x2 IYUV -> 12 bytes per frame
        FrameGeometry::new(PixelFormat::Iyuv, 4, 2).unwrap()
    }

    // Frame n (1-based) is filled with byte n.
    fn frames(count: u8, trailing: usize) -> Vec<u8> {
        let size = geometry().frame_size();
        let mut data: Vec<u8> = (1..=count).flat_map(|n| vec![n; size]).collect();
        data.extend(std::iter::repeat(0xEE).take(trailing));
        data
    }

    fn index(n: u64) -> FrameIndex {
        FrameIndex::new(n).unwrap()
    }

    /// Counts seeks so tests can check when the source repositions.
    struct SeekCounter {
        inner: Cursor<Vec<u8>>,
        seeks: usize,
    }

    impl Read for SeekCounter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for SeekCounter {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.seeks += 1;
            self.inner.seek(pos)
        }
    }

    /// Cursor that can fail a seek, or fail one read once the position reaches a byte.
    struct FaultyStream {
        inner: Cursor<Vec<u8>>,
        seeks: usize,
        fail_seeks: bool,
        fail_read_at: Option<u64>,
    }

    impl FaultyStream {
        fn new(data: Vec<u8>) -> Self {
            Self { inner: Cursor::new(data), seeks: 0, fail_seeks: false, fail_read_at: None }
        }
    }

    impl Read for FaultyStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(at) = self.fail_read_at else {
                return self.inner.read(buf);
            };
            let pos = self.inner.position();
            if pos >= at {
                self.fail_read_at = None;
                return Err(io::Error::new(io::ErrorKind::Other, "device error"));
            }
            let n = buf.len().min((at - pos) as usize);
            self.inner.read(&mut buf[..n])
        }
    }

    impl Seek for FaultyStream {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.seeks += 1;
            if self.fail_seeks {
                return Err(io::Error::new(io::ErrorKind::Other, "seek refused"));
            }
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_frame_index_arithmetic() {
        assert_eq!(FrameIndex::FIRST.get(), 1);
        assert_eq!(FrameIndex::new(0), None);
        assert_eq!(FrameIndex::FIRST.prev(), None);
        assert_eq!(index(3).prev(), Some(index(2)));
        assert_eq!(index(3).next(), index(4));
        assert_eq!(index(3).byte_offset(12), Some(24));
        assert_eq!(index(u64::MAX).byte_offset(2), None);
    }

    #[test]
    fn test_read_at_returns_requested_frame() {
        let mut source = FrameSource::from_stream(Cursor::new(frames(3, 0)), geometry());
        assert_eq!(source.read_at(index(2)).unwrap(), &[2u8; 12][..]);
        assert_eq!(source.read_at(index(3)).unwrap(), &[3u8; 12][..]);
        assert_eq!(source.read_at(index(1)).unwrap(), &[1u8; 12][..]);
    }

    #[test]
    fn test_reread_is_idempotent() {
        let mut source = FrameSource::from_stream(Cursor::new(frames(2, 0)), geometry());
        let first = source.read_at(FrameIndex::FIRST).unwrap().to_vec();
        let again = source.read_at(FrameIndex::FIRST).unwrap().to_vec();
        assert_eq!(first, again);
        assert_eq!(source.read_at(index(2)).unwrap(), &[2u8; 12][..]);
    }

    #[test]
    fn test_sequential_reads_skip_seeking() {
        let stream = SeekCounter { inner: Cursor::new(frames(3, 0)), seeks: 0 };
        let mut source = FrameSource::from_stream(stream, geometry());

        source.read_at(index(1)).unwrap();
        source.read_at(index(2)).unwrap();
        source.read_at(index(3)).unwrap();
        // Unknown start position costs one seek; the rest follow on.
        assert_eq!(source.stream.as_ref().unwrap().seeks, 1);

        source.read_at(index(1)).unwrap();
        assert_eq!(source.stream.as_ref().unwrap().seeks, 2);
    }

    #[test]
    fn test_short_read_keeps_previous_frame() {
        let mut source = FrameSource::from_stream(Cursor::new(frames(2, 5)), geometry());
        source.read_at(index(2)).unwrap();

        let err = source.read_at(index(3)).unwrap_err();
        assert!(matches!(err, FrameError::EndOfStream { index: i } if i == index(3)));
        assert_eq!(source.frame(), &[2u8; 12][..]);

        // Far past the end.
        assert!(source.read_at(index(100)).is_err());
        assert_eq!(source.frame(), &[2u8; 12][..]);

        // Recovers with an absolute seek.
        assert_eq!(source.read_at(index(1)).unwrap(), &[1u8; 12][..]);
    }

    #[test]
    fn test_read_error_mid_frame_keeps_previous_frame() {
        let mut stream = FaultyStream::new(frames(3, 0));
        // Fails partway through frame 2.
        stream.fail_read_at = Some(18);
        let mut source = FrameSource::from_stream(stream, geometry());

        assert_eq!(source.read_at(index(1)).unwrap(), &[1u8; 12][..]);

        let err = source.read_at(index(2)).unwrap_err();
        assert!(matches!(err, FrameError::EndOfStream { index: i } if i == index(2)));
        assert_eq!(source.frame(), &[1u8; 12][..]);
        assert_eq!(source.position, None);

        // The retry repositions with an absolute seek.
        assert_eq!(source.read_at(index(2)).unwrap(), &[2u8; 12][..]);
        assert_eq!(source.stream.as_ref().unwrap().seeks, 2);
    }

    #[test]
    fn test_seek_error_keeps_previous_frame() {
        let mut source = FrameSource::from_stream(FaultyStream::new(frames(3, 0)), geometry());
        source.stream.as_mut().unwrap().fail_seeks = true;

        assert!(matches!(
            source.read_at(index(1)),
            Err(FrameError::EndOfStream { .. })
        ));
        assert_eq!(source.frame(), &[0u8; 12][..]);
        assert_eq!(source.position, None);

        source.stream.as_mut().unwrap().fail_seeks = false;
        assert_eq!(source.read_at(index(1)).unwrap(), &[1u8; 12][..]);

        // Jumping to frame 3 needs a seek, which fails again.
        source.stream.as_mut().unwrap().fail_seeks = true;
        assert!(source.read_at(index(3)).is_err());
        assert_eq!(source.frame(), &[1u8; 12][..]);

        source.stream.as_mut().unwrap().fail_seeks = false;
        assert_eq!(source.read_at(index(3)).unwrap(), &[3u8; 12][..]);
    }

    #[test]
    fn test_stream_shorter_than_one_frame() {
        let mut source = FrameSource::from_stream(Cursor::new(vec![7u8; 11]), geometry());
        assert!(matches!(
            source.read_at(FrameIndex::FIRST),
            Err(FrameError::EndOfStream { .. })
        ));
        assert_eq!(source.frame(), &[0u8; 12][..]);
    }

    #[test]
    fn test_frame_count() {
        let mut source = FrameSource::from_stream(Cursor::new(frames(4, 7)), geometry());
        let count = source.frame_count().unwrap();
        assert_eq!(count, FrameCount { frames: 4, trailing_bytes: 7 });
        // Position moved to the end; the next read must still land on frame 2.
        assert_eq!(source.read_at(index(2)).unwrap(), &[2u8; 12][..]);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut source = FrameSource::from_stream(Cursor::new(frames(1, 0)), geometry());
        assert!(source.is_open());
        source.close();
        source.close();
        assert!(!source.is_open());
        assert!(source.read_at(FrameIndex::FIRST).is_err());
        assert!(source.frame_count().is_err());
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&frames(2, 0)).unwrap();
        file.flush().unwrap();

        let mut source = FrameSource::open(file.path(), geometry()).unwrap();
        assert_eq!(source.read_at(FrameIndex::FIRST).unwrap(), &[1u8; 12][..]);
        assert_eq!(source.read_at(index(2)).unwrap(), &[2u8; 12][..]);
        assert!(source.read_at(index(3)).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yuv");
        match FrameSource::open(&path, geometry()) {
            Err(FrameError::Open { path: p, .. }) => assert_eq!(p, path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opened a missing file"),
        }
    }
}
