use bytemuck::{Pod, Zeroable};

use super::sampler::RenderablePoint;

/// One point as laid out for GPU upload: direction in xyz, energy in w.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub energy: f32,
}

/// Fixed-capacity point buffer owned by the renderer and filled once per tick.
pub struct PointBuffer {
    points: Vec<PointData>,
    frequencies: Vec<f32>,
    count: usize,
}

impl PointBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: vec![PointData::default(); capacity],
            frequencies: vec![0.0; capacity],
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.points.len()
    }

    /// Number of valid entries from the last write.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn points(&self) -> &[PointData] {
        &self.points[..self.count]
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies[..self.count]
    }

    /// Replace the contents with `points`, dropping whatever exceeds capacity.
    /// Returns the number of entries written.
    pub fn write(&mut self, points: &[RenderablePoint]) -> usize {
        let n = points.len().min(self.capacity());
        if n < points.len() {
            log::debug!("Point buffer full: dropped {} points", points.len() - n);
        }
        for (i, p) in points[..n].iter().enumerate() {
            let [x, y, z] = p.direction;
            self.points[i] = PointData {
                x,
                y,
                z,
                energy: p.energy,
            };
            self.frequencies[i] = p.frequency;
        }
        // Zero whatever the previous write left past the new count
        for i in n..self.count {
            self.points[i] = PointData::zeroed();
            self.frequencies[i] = 0.0;
        }
        self.count = n;
        n
    }

    pub fn clear(&mut self) {
        self.write(&[]);
    }

    /// Valid points as raw bytes for a storage-buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.points())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rp(energy: f32) -> RenderablePoint {
        RenderablePoint {
            direction: [0.0, 1.0, 0.0],
            energy,
            frequency: 1000.0,
        }
    }

    #[test]
    fn write_fills_parallel_buffers() {
        let mut buffer = PointBuffer::new(4);
        assert_eq!(buffer.write(&[rp(1.0), rp(2.0)]), 2);
        assert_eq!(buffer.count(), 2);
        assert_eq!(buffer.points()[1], PointData { x: 0.0, y: 1.0, z: 0.0, energy: 2.0 });
        assert_eq!(buffer.frequencies(), &[1000.0, 1000.0]);
        assert_eq!(buffer.as_bytes().len(), 2 * 16);
    }

    #[test]
    fn write_truncates_at_capacity() {
        let mut buffer = PointBuffer::new(2);
        assert_eq!(buffer.write(&[rp(1.0), rp(2.0), rp(3.0)]), 2);
        assert_eq!(buffer.points().len(), 2);
    }

    #[test]
    fn shorter_write_clears_stale_entries() {
        let mut buffer = PointBuffer::new(3);
        buffer.write(&[rp(1.0), rp(2.0), rp(3.0)]);
        buffer.write(&[rp(9.0)]);
        assert_eq!(buffer.count(), 1);
        assert_eq!(buffer.points[2], PointData::default());
        buffer.clear();
        assert_eq!(buffer.count(), 0);
        assert!(buffer.as_bytes().is_empty());
    }
}
