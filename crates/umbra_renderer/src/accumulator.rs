//! Progressive pixel accumulator.
//!
//! Worker tasks write samples into their own [`LandingBuffer`] without any
//! locking. Finished buffers are merged into the shared aggregate under a
//! mutex, so readers only ever observe whole passes.

use crate::error::{RenderError, RenderResult};
use crate::image::{quantize, Dimensions, Image};
use crate::material::Color;
use rayon::prelude::*;
use std::io::{self, Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

const GAMMA: f64 = 2.2;

/// Longest scene name accepted when reading persisted state.
const MAX_SCENE_NAME_LEN: i64 = 1 << 16;

/// Largest pixel count accepted when reading persisted state.
const MAX_PERSISTED_PIXELS: i64 = 1 << 28;

/// Samples produced by one task during one pass.
///
/// Addressed over the full image, but only the pixels the task actually
/// claimed are stored.
#[derive(Debug, Clone)]
pub struct LandingBuffer {
    dims: Dimensions,
    samples: Vec<(usize, Color)>,
}

impl LandingBuffer {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            samples: Vec::new(),
        }
    }

    /// Record the sample for pixel `(x, y)`.
    pub fn set(&mut self, x: usize, y: usize, colour: Color) {
        debug_assert!(x < self.dims.width && y < self.dims.height);
        self.samples.push((self.dims.index(x, y), colour));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug)]
struct State {
    passes: u64,
    aggregate: Vec<Color>,
}

/// Running per-pixel colour sums plus the number of merged passes.
#[derive(Debug)]
pub struct Accumulator {
    dims: Dimensions,
    state: Mutex<State>,
}

impl Accumulator {
    pub fn new(dims: Dimensions) -> Self {
        Self::with_state(dims, 0, vec![Color::ZERO; dims.pixel_count()])
    }

    fn with_state(dims: Dimensions, passes: u64, aggregate: Vec<Color>) -> Self {
        Self {
            dims,
            state: Mutex::new(State { passes, aggregate }),
        }
    }

    // A panic while holding the lock cannot leave the sums half-merged in a
    // way later readers care about, so poisoning is ignored.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Add one landing buffer as a complete pass.
    pub fn merge(&self, buffer: &LandingBuffer) {
        self.merge_pass(std::slice::from_ref(buffer));
    }

    /// Add the buffers of every task that took part in one pass. The pass
    /// counter goes up by one regardless of how many buffers there are.
    pub fn merge_pass(&self, buffers: &[LandingBuffer]) {
        let mut state = self.state();
        for buffer in buffers {
            debug_assert_eq!(buffer.dims, self.dims);
            for &(index, colour) in &buffer.samples {
                state.aggregate[index] += colour;
            }
        }
        state.passes += 1;
    }

    pub fn passes(&self) -> u64 {
        self.state().passes
    }

    /// Mean of all channels over all pixels of the aggregate.
    pub fn mean_brightness(&self) -> f64 {
        mean(&self.state().aggregate)
    }

    /// Tone-map the aggregate for display.
    ///
    /// Pixels are scaled so that the mean brightness maps to
    /// `0.5 * exposure`, then gamma corrected. An all-black aggregate stays
    /// black.
    pub fn to_image(&self, exposure: f64) -> Image {
        let state = self.state();
        let scale = 0.5 * exposure / mean(&state.aggregate);
        let pixels = state
            .aggregate
            .par_iter()
            .map(|&c| {
                let c = (c * scale).powf(1.0 / GAMMA);
                [quantize(c.x), quantize(c.y), quantize(c.z), 255]
            })
            .collect();

        Image {
            width: self.dims.width,
            height: self.dims.height,
            pixels,
        }
    }

    /// Persist as little-endian `name_len, name, passes, width, height`
    /// followed by `width * height` RGB triples of `f64`.
    pub fn write_to<W: Write>(&self, mut writer: W, scene_name: &str) -> RenderResult<()> {
        let state = self.state();
        writer.write_all(&(scene_name.len() as i64).to_le_bytes())?;
        writer.write_all(scene_name.as_bytes())?;
        writer.write_all(&(state.passes as i64).to_le_bytes())?;
        writer.write_all(&(self.dims.width as i64).to_le_bytes())?;
        writer.write_all(&(self.dims.height as i64).to_le_bytes())?;
        for c in &state.aggregate {
            for channel in c.to_array() {
                writer.write_all(&channel.to_le_bytes())?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Read state written by [`Accumulator::write_to`], returning the scene
    /// name it was saved under.
    pub fn read_from<R: Read>(mut reader: R) -> RenderResult<(String, Accumulator)> {
        let name_len = read_i64(&mut reader)?;
        if !(0..=MAX_SCENE_NAME_LEN).contains(&name_len) {
            return Err(corrupt(format!("scene name length {name_len}")));
        }
        let name = read_bytes(&mut reader, name_len as usize)?;
        let name = String::from_utf8(name).map_err(|_| corrupt("scene name is not UTF-8".into()))?;

        let passes = read_i64(&mut reader)?;
        let width = read_i64(&mut reader)?;
        let height = read_i64(&mut reader)?;
        if passes < 0 {
            return Err(corrupt(format!("negative pass count {passes}")));
        }
        let pixel_count = match width.checked_mul(height) {
            Some(n) if width > 0 && height > 0 && n <= MAX_PERSISTED_PIXELS => n as usize,
            _ => return Err(corrupt(format!("image size {width}x{height}"))),
        };
        let dims = Dimensions::new(width as usize, height as usize)?;

        let raw = read_bytes(&mut reader, pixel_count * 3 * 8)?;
        let aggregate = raw
            .chunks_exact(24)
            .map(|px| {
                let channel = |i: usize| {
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(&px[i * 8..i * 8 + 8]);
                    f64::from_le_bytes(bytes)
                };
                Color::new(channel(0), channel(1), channel(2))
            })
            .collect();

        log::debug!("Read accumulator for '{name}': {width}x{height}, {passes} passes");
        Ok((name, Self::with_state(dims, passes as u64, aggregate)))
    }
}

fn mean(aggregate: &[Color]) -> f64 {
    let sum: f64 = aggregate.iter().map(|c| c.x + c.y + c.z).sum();
    sum / aggregate.len() as f64 / 3.0
}

fn corrupt(msg: String) -> RenderError {
    RenderError::CorruptAccumulator(msg)
}

fn truncated(err: io::Error) -> RenderError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        corrupt("unexpected end of data".into())
    } else {
        err.into()
    }
}

fn read_i64<R: Read>(reader: &mut R) -> RenderResult<i64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes).map_err(truncated)?;
    Ok(i64::from_le_bytes(bytes))
}

fn read_bytes<R: Read>(reader: &mut R, len: usize) -> RenderResult<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(corrupt(format!("expected {len} bytes, found {}", buf.len())));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(w: usize, h: usize) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    fn uniform(d: Dimensions, c: Color) -> LandingBuffer {
        let mut buf = LandingBuffer::new(d);
        for y in 0..d.height {
            for x in 0..d.width {
                buf.set(x, y, c);
            }
        }
        buf
    }

    fn snapshot(acc: &Accumulator) -> (u64, Vec<Color>) {
        let state = acc.state();
        (state.passes, state.aggregate.clone())
    }

    #[test]
    fn test_landing_buffer_is_sparse() {
        let mut buf = LandingBuffer::new(dims(100, 100));
        assert!(buf.is_empty());
        buf.set(99, 99, Color::ONE);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let d = dims(3, 2);
        let mut a = LandingBuffer::new(d);
        a.set(0, 0, Color::new(1.0, 0.0, 0.0));
        a.set(2, 1, Color::new(0.5, 0.5, 0.5));
        let mut b = LandingBuffer::new(d);
        b.set(0, 0, Color::new(0.0, 2.0, 0.0));
        b.set(1, 1, Color::new(0.0, 0.0, 3.0));

        let ab = Accumulator::new(d);
        ab.merge(&a);
        ab.merge(&b);
        let ba = Accumulator::new(d);
        ba.merge(&b);
        ba.merge(&a);

        assert_eq!(snapshot(&ab), snapshot(&ba));
        assert_eq!(ab.passes(), 2);
        assert_eq!(snapshot(&ab).1[0], Color::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_merge_pass_counts_once() {
        let d = dims(2, 2);
        let mut left = LandingBuffer::new(d);
        left.set(0, 0, Color::ONE);
        left.set(0, 1, Color::ONE);
        let mut right = LandingBuffer::new(d);
        right.set(1, 0, Color::ONE);
        right.set(1, 1, Color::ONE);

        let acc = Accumulator::new(d);
        acc.merge_pass(&[left, right]);
        assert_eq!(acc.passes(), 1);
        assert_eq!(acc.mean_brightness(), 1.0);
    }

    #[test]
    fn test_to_image_is_idempotent() {
        let d = dims(4, 4);
        let mut buf = LandingBuffer::new(d);
        for i in 0..16 {
            buf.set(i % 4, i / 4, Color::new(i as f64, 0.5, (16 - i) as f64 * 0.1));
        }
        let acc = Accumulator::new(d);
        acc.merge(&buf);

        assert_eq!(acc.to_image(1.0), acc.to_image(1.0));
        assert_eq!(acc.to_image(2.5), acc.to_image(2.5));
    }

    #[test]
    fn test_uniform_image_independent_of_dimensions() {
        let mut expected = None;
        for (w, h) in [(1, 1), (7, 3), (64, 48)] {
            let d = dims(w, h);
            let acc = Accumulator::new(d);
            acc.merge(&uniform(d, Color::splat(3.7)));
            acc.merge(&uniform(d, Color::splat(3.7)));

            let image = acc.to_image(1.0);
            assert_eq!(image.pixels.len(), w * h);
            let first = image.pixels[0];
            assert!(image.pixels.iter().all(|&p| p == first));

            // Mean maps to 0.5 before gamma
            assert_eq!(first, [186, 186, 186, 255]);
            assert_eq!(*expected.get_or_insert(first), first);
        }
    }

    #[test]
    fn test_exposure_brightens() {
        let d = dims(2, 1);
        let mut buf = LandingBuffer::new(d);
        buf.set(0, 0, Color::splat(1.0));
        buf.set(1, 0, Color::splat(3.0));
        let acc = Accumulator::new(d);
        acc.merge(&buf);

        let dim = acc.to_image(0.5);
        let bright = acc.to_image(2.0);
        assert!(bright.get(0, 0)[0] > dim.get(0, 0)[0]);
        assert_eq!(bright.get(1, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_black_accumulator_renders_black() {
        let acc = Accumulator::new(dims(2, 2));
        let image = acc.to_image(1.0);
        assert!(image.pixels.iter().all(|&p| p == [0, 0, 0, 255]));
    }

    #[test]
    fn test_persistence_round_trip() {
        let d = dims(3, 2);
        let mut buf = LandingBuffer::new(d);
        buf.set(1, 1, Color::new(0.25, -1.5, 1e300));
        buf.set(2, 0, Color::new(1.0, 2.0, 3.0));
        let acc = Accumulator::new(d);
        acc.merge(&buf);
        acc.merge(&buf);

        let mut bytes = Vec::new();
        acc.write_to(&mut bytes, "cornell").unwrap();
        assert_eq!(bytes.len(), 8 + 7 + 8 * 3 + 6 * 24);
        assert_eq!(&bytes[..8], &7i64.to_le_bytes());

        let (name, back) = Accumulator::read_from(bytes.as_slice()).unwrap();
        assert_eq!(name, "cornell");
        assert_eq!(back.dimensions(), d);
        assert_eq!(snapshot(&back), snapshot(&acc));
    }

    #[test]
    fn test_read_rejects_corrupt_data() {
        let acc = Accumulator::new(dims(2, 2));
        let mut bytes = Vec::new();
        acc.write_to(&mut bytes, "x").unwrap();

        // Truncated pixel data
        let short = &bytes[..bytes.len() - 1];
        assert!(matches!(
            Accumulator::read_from(short),
            Err(RenderError::CorruptAccumulator(_))
        ));

        // Truncated header
        assert!(matches!(
            Accumulator::read_from(&bytes[..4]),
            Err(RenderError::CorruptAccumulator(_))
        ));

        // Negative width
        let mut bad = bytes.clone();
        bad[17..25].copy_from_slice(&(-2i64).to_le_bytes());
        assert!(matches!(
            Accumulator::read_from(bad.as_slice()),
            Err(RenderError::CorruptAccumulator(_))
        ));

        // Absurd name length
        let mut bad = bytes;
        bad[..8].copy_from_slice(&i64::MAX.to_le_bytes());
        assert!(matches!(
            Accumulator::read_from(bad.as_slice()),
            Err(RenderError::CorruptAccumulator(_))
        ));
    }
}
