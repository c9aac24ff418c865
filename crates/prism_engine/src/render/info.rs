//! Frame statistics

use super::backend::Primitive;

/// Counters reported by [`Renderer::info`](super::Renderer::info)
///
/// Per-frame counters reset at the start of every `render` call; resource
/// counters track live device objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderInfo {
    /// Frames rendered
    pub frame: u64,
    /// Draw calls this frame
    pub calls: u64,
    /// Triangles this frame
    pub triangles: u64,
    /// Line segments this frame
    pub lines: u64,
    /// Points this frame
    pub points: u64,
    /// Geometries with device buffers
    pub geometries: usize,
    /// Textures with device storage
    pub textures: usize,
    /// Live programs
    pub programs: usize,
}

impl RenderInfo {
    /// Reset per-frame counters
    pub fn reset_frame(&mut self) {
        self.calls = 0;
        self.triangles = 0;
        self.lines = 0;
        self.points = 0;
    }

    /// Account for one draw of `count` elements times `instances`
    pub fn record_draw(&mut self, primitive: Primitive, count: usize, instances: usize) {
        let total = (count * instances) as u64;
        self.calls += 1;
        match primitive {
            Primitive::Triangles => self.triangles += total / 3,
            Primitive::Lines => self.lines += total / 2,
            Primitive::LineStrip => self.lines += total.saturating_sub(instances as u64),
            Primitive::LineLoop => self.lines += total,
            Primitive::Points => self.points += total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_draw_per_primitive() {
        let mut info = RenderInfo::default();
        info.record_draw(Primitive::Triangles, 36, 2);
        info.record_draw(Primitive::Lines, 10, 1);
        info.record_draw(Primitive::LineStrip, 5, 1);
        info.record_draw(Primitive::Points, 7, 1);
        assert_eq!(info.calls, 4);
        assert_eq!(info.triangles, 24);
        assert_eq!(info.lines, 9);
        assert_eq!(info.points, 7);
        info.reset_frame();
        assert_eq!(info.calls, 0);
    }
}
