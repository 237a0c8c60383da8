use serde::Serialize;

use super::{Curve, Error, Header, Kind, Variant};
use crate::{
    cursor::{BoundsError, Reader, Writer},
    geometry::Point,
    tessellate,
};

/// Straight segment starting at `(x0, y0)` with heading `hdg0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Line {
    #[serde(flatten)]
    header: Header,
}

impl Line {
    pub fn new(header: Header) -> Self {
        Self { header }
    }
}

impl Curve for Line {
    fn header(&self) -> &Header {
        &self.header
    }

    fn get_xy(&self, s: f64) -> Point<f64> {
        let h = &self.header;
        let (sin, cos) = h.hdg0.sin_cos();
        Point {
            x: h.x0 + cos * (s - h.s0),
            y: h.y0 + sin * (s - h.s0),
        }
    }

    fn get_grad(&self, _: f64) -> Point<f64> {
        Point::from_angle(self.header.hdg0)
    }

    fn approximate_linear(&self, eps: f64) -> Vec<f64> {
        tessellate::uniform(self.header.s0, self.header.length, eps)
    }
}

impl Variant for Line {
    const KIND: Kind = Kind::Line;

    fn decode_trailer(header: Header, _: &mut Reader) -> Result<Self, Error> {
        Ok(Self::new(header))
    }

    fn encode_trailer(&self, _: &mut Writer) -> Result<(), BoundsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cursor::ByteOrder, Record};
    use approx::assert_abs_diff_eq;

    fn line(s0: f64, x0: f64, y0: f64, hdg0: f64, length: f64) -> Line {
        Line::new(Header::new(s0, x0, y0, hdg0, length).unwrap())
    }

    #[test]
    fn along_x_axis() {
        let line = line(0.0, 0.0, 0.0, 0.0, 10.0);
        assert_eq!(line.get_xy(5.0), Point::new(5.0, 0.0));
        for s in [0.0, 2.5, 10.0, 12.0] {
            assert_eq!(line.get_grad(s), Point::new(1.0, 0.0));
        }
    }

    #[test]
    fn start_point_and_extrapolation() {
        let line = line(3.0, -1.0, 2.0, 2.0, 4.0);
        let start = line.get_xy(3.0);
        assert_abs_diff_eq!(start.x, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(start.y, 2.0, epsilon = 1e-12);

        let before = line.get_xy(1.0);
        let grad = line.get_grad(1.0);
        assert_abs_diff_eq!(before.x, -1.0 - 2.0 * grad.x, epsilon = 1e-12);
        assert_abs_diff_eq!(before.y, 2.0 - 2.0 * grad.y, epsilon = 1e-12);
        assert_abs_diff_eq!(grad.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn tessellation() {
        assert_eq!(
            line(0.0, 0.0, 0.0, 0.0, 10.0).approximate_linear(3.0),
            vec![0.0, 3.0, 6.0, 9.0, 10.0]
        );
        let samples = line(1.0, 0.0, 0.0, 0.0, 2.0).approximate_linear(0.5);
        assert_eq!(samples, vec![1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn round_trip() {
        let record = Record::from(line(1.0, 2.0, 3.0, 0.5, 4.0));
        let bytes = record.to_bytes(ByteOrder::Little).unwrap();
        assert_eq!(bytes.len(), 44);
        assert_eq!(&bytes[40..44], &1u32.to_le_bytes());

        let decoded = Record::from_bytes(&bytes, ByteOrder::Little).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.kind(), Kind::Line);
        let header = decoded.header();
        assert_eq!(
            (header.s0(), header.x0(), header.y0(), header.hdg0(), header.length()),
            (1.0, 2.0, 3.0, 0.5, 4.0)
        );
        assert_eq!(decoded.to_bytes(ByteOrder::Little).unwrap(), bytes);
    }
}
