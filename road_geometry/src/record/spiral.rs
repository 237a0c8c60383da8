use serde::Serialize;

use super::{finite, Curve, Error, Header, Kind, Variant};
use crate::{
    cursor::{BoundsError, Reader, Writer},
    geometry::Point,
    quadrature, tessellate,
};

/// Heading change covered by a single quadrature panel, in radians.
const MAX_PANEL_TURN: f64 = 0.25;
/// Arc length covered by a single quadrature panel, in meters.
const MAX_PANEL_LENGTH: f64 = 25.0;
const MAX_PANELS: f64 = 4096.0;

/// Clothoid: curvature changes linearly from `curv_start` to `curv_end`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spiral {
    #[serde(flatten)]
    header: Header,
    curv_start: f64,
    curv_end: f64,
}

impl Spiral {
    pub fn new(header: Header, curv_start: f64, curv_end: f64) -> Result<Self, Error> {
        Ok(Self {
            header,
            curv_start: finite("curv_start", curv_start)?,
            curv_end: finite("curv_end", curv_end)?,
        })
    }

    pub fn curv_start(&self) -> f64 {
        self.curv_start
    }

    pub fn curv_end(&self) -> f64 {
        self.curv_end
    }

    /// Rate of change of curvature along the segment, 1/m².
    pub fn curv_rate(&self) -> f64 {
        (self.curv_end - self.curv_start) / self.header.length
    }

    pub fn curvature_at(&self, s: f64) -> f64 {
        self.curv_start + self.curv_rate() * (s - self.header.s0)
    }

    pub fn heading_at(&self, s: f64) -> f64 {
        self.heading_after(s - self.header.s0)
    }

    fn heading_after(&self, t: f64) -> f64 {
        self.header.hdg0 + t * (self.curv_start + 0.5 * self.curv_rate() * t)
    }

    fn panels(&self, t: f64) -> usize {
        let t = t.abs();
        let turn = (self.curv_start.abs() + self.curv_rate().abs() * t) * t;
        (turn / MAX_PANEL_TURN)
            .max(t / MAX_PANEL_LENGTH)
            .ceil()
            .clamp(1.0, MAX_PANELS) as usize
    }
}

impl Curve for Spiral {
    fn header(&self) -> &Header {
        &self.header
    }

    fn get_xy(&self, s: f64) -> Point<f64> {
        let t = s - self.header.s0;
        let offset: Point<f64> = quadrature::integrate(0.0, t, self.panels(t), |u| {
            Point::from_angle(self.heading_after(u))
        });
        self.header.start() + offset
    }

    fn get_grad(&self, s: f64) -> Point<f64> {
        Point::from_angle(self.heading_at(s))
    }

    fn approximate_linear(&self, eps: f64) -> Vec<f64> {
        tessellate::uniform(self.header.s0, self.header.length, eps)
    }
}

impl Variant for Spiral {
    const KIND: Kind = Kind::Spiral;

    fn decode_trailer(header: Header, reader: &mut Reader) -> Result<Self, Error> {
        let curv_start = reader.read_f64()?;
        let curv_end = reader.read_f64()?;
        Self::new(header, curv_start, curv_end)
    }

    fn encode_trailer(&self, writer: &mut Writer) -> Result<(), BoundsError> {
        writer.write_f64(self.curv_start)?;
        writer.write_f64(self.curv_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cursor::ByteOrder, Arc, Line, Record};
    use approx::assert_abs_diff_eq;

    fn header(s0: f64, x0: f64, y0: f64, hdg0: f64, length: f64) -> Header {
        Header::new(s0, x0, y0, hdg0, length).unwrap()
    }

    #[test]
    fn constant_curvature_matches_arc() {
        let header = header(4.0, 1.0, -2.0, 0.4, 50.0);
        let spiral = Spiral::new(header, 0.08, 0.08).unwrap();
        let arc = Arc::new(header, 0.08).unwrap();
        for i in 0..=25 {
            let s = 4.0 + 2.0 * i as f64;
            let a = arc.get_xy(s);
            let b = spiral.get_xy(s);
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
            let ga = arc.get_grad(s);
            let gb = spiral.get_grad(s);
            assert_abs_diff_eq!(ga.x, gb.x, epsilon = 1e-12);
            assert_abs_diff_eq!(ga.y, gb.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_curvature_matches_line() {
        let header = header(0.0, 3.0, 3.0, -1.0, 200.0);
        let spiral = Spiral::new(header, 0.0, 0.0).unwrap();
        let line = Line::new(header);
        for s in [0.0, 33.3, 120.0, 200.0] {
            let a = line.get_xy(s);
            let b = spiral.get_xy(s);
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn starts_at_origin() {
        let spiral = Spiral::new(header(10.0, 5.0, 6.0, 2.0, 30.0), -0.01, 0.05).unwrap();
        let start = spiral.get_xy(10.0);
        assert_abs_diff_eq!(start.x, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(start.y, 6.0, epsilon = 1e-12);
        let grad = spiral.get_grad(10.0);
        assert_abs_diff_eq!(grad.x, 2.0_f64.cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(grad.y, 2.0_f64.sin(), epsilon = 1e-12);
    }

    #[test]
    fn curvature_is_linear() {
        let spiral = Spiral::new(header(0.0, 0.0, 0.0, 0.0, 20.0), 0.0, 0.1).unwrap();
        assert_abs_diff_eq!(spiral.curv_rate(), 0.005, epsilon = 1e-15);
        assert_abs_diff_eq!(spiral.curvature_at(10.0), 0.05, epsilon = 1e-15);
        assert_abs_diff_eq!(spiral.curvature_at(20.0), 0.1, epsilon = 1e-15);
        // heading grows by the integral of the curvature
        assert_abs_diff_eq!(spiral.heading_at(20.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn gradient_is_unit_and_follows_position() {
        let spiral = Spiral::new(header(1.0, 0.0, 0.0, 0.3, 80.0), 0.02, -0.04).unwrap();
        let h = 1e-5;
        for i in -2..=42 {
            let s = 1.0 + 2.0 * i as f64;
            let grad = spiral.get_grad(s);
            assert_abs_diff_eq!(grad.norm(), 1.0, epsilon = 1e-12);
            let diff = (spiral.get_xy(s + h) - spiral.get_xy(s - h)) / (2.0 * h);
            assert_abs_diff_eq!(diff.x, grad.x, epsilon = 1e-6);
            assert_abs_diff_eq!(diff.y, grad.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn round_trip() {
        let record = Record::from(Spiral::new(header(1.0, 2.0, 3.0, 4.0, 5.0), 0.001, -0.2).unwrap());
        let bytes = record.to_bytes(ByteOrder::Little).unwrap();
        assert_eq!(bytes.len(), 60);
        assert_eq!(&bytes[40..44], &3u32.to_le_bytes());
        let decoded = Record::from_bytes(&bytes, ByteOrder::Little).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.to_bytes(ByteOrder::Little).unwrap(), bytes);
    }

    #[test]
    fn rejects_non_finite_curvature() {
        let header = header(0.0, 0.0, 0.0, 0.0, 1.0);
        assert_eq!(
            Spiral::new(header, f64::NAN, 0.0),
            Err(Error::NonFiniteParameter("curv_start"))
        );
        assert_eq!(
            Spiral::new(header, 0.0, f64::NEG_INFINITY),
            Err(Error::NonFiniteParameter("curv_end"))
        );
    }
}
