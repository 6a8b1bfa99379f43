//! Sample ring between the playback writer and the audio output callback.

use std::collections::VecDeque;

/// Bounded FIFO of interleaved i16 samples.
///
/// Single writer (playback task) and single reader (output callback), shared
/// behind a mutex. When full, the oldest samples are dropped so latency stays
/// bounded; when empty, the reader gets silence.
pub struct SampleRing {
    samples: VecDeque<i16>,
    capacity: usize,
    dropped: u64,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append samples, evicting the oldest ones if the ring would overflow.
    pub fn push(&mut self, input: &[i16]) {
        // only the newest `capacity` samples of the input can survive
        let skipped = input.len().saturating_sub(self.capacity);
        self.dropped += skipped as u64;
        let input = &input[skipped..];
        let overflow = (self.samples.len() + input.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.samples.drain(..overflow.min(self.samples.len()));
            self.dropped += overflow as u64;
        }
        self.samples.extend(input.iter().copied());
    }

    /// Fill `output`, padding with silence. Returns how many real samples were read.
    pub fn read(&mut self, output: &mut [i16]) -> usize {
        let n = output.len().min(self.samples.len());
        for (slot, sample) in output.iter_mut().zip(self.samples.drain(..n)) {
            *slot = sample;
        }
        output[n..].fill(0);
        n
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
