use std::ops::Range;

use crate::error::IdentifyError;
use crate::features::FeatureSequence;

/// Splits feature sequences into consecutive blocks of `test_frames` frames.
///
/// Blocks tile the sequence left to right with no overlap. When the length
/// is not a multiple of `test_frames` the last block is shorter; it is not
/// padded, so models must accept any block of at least one frame.
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    test_frames: usize,
}

/// One block of frames borrowed from a [`FeatureSequence`].
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    /// Position of the block within the utterance.
    pub index: usize,
    /// Frame range `[start, end)` in the source sequence.
    pub start: usize,
    pub frames: &'a [Vec<f32>],
}

impl Segmenter {
    pub fn new(test_frames: usize) -> Result<Self, IdentifyError> {
        if test_frames == 0 {
            return Err(IdentifyError::InvalidInput("test_frames must be positive".into()));
        }
        Ok(Self { test_frames })
    }

    pub fn test_frames(&self) -> usize {
        self.test_frames
    }

    /// Splits `seq` into `ceil(len / test_frames)` segments.
    pub fn split<'a>(&self, seq: &'a FeatureSequence) -> Result<Vec<Segment<'a>>, IdentifyError> {
        let frames = seq.frames();
        Ok(segment_ranges(frames.len(), self.test_frames)?
            .into_iter()
            .enumerate()
            .map(|(index, r)| Segment {
                index,
                start: r.start,
                frames: &frames[r],
            })
            .collect())
    }
}

impl Segment<'_> {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn end(&self) -> usize {
        self.start + self.frames.len()
    }
}

/// Returns the frame ranges for a sequence of `len` frames:
/// `[i*T, min((i+1)*T, len))` for `i` in `0..ceil(len/T)`.
pub fn segment_ranges(len: usize, test_frames: usize) -> Result<Vec<Range<usize>>, IdentifyError> {
    if test_frames == 0 {
        return Err(IdentifyError::InvalidInput("test_frames must be positive".into()));
    }
    if len == 0 {
        return Err(IdentifyError::InvalidInput("cannot segment an empty sequence".into()));
    }
    let count = len.div_ceil(test_frames);
    Ok((0..count)
        .map(|i| {
            let start = i * test_frames;
            start..(start + test_frames).min(len)
        })
        .collect())
}
