use std::f64::consts::FRAC_PI_2;

use serde::Serialize;

use super::{Curve, Error, Header, Kind, Variant};
use crate::{
    cursor::{BoundsError, Reader, Writer},
    geometry::Point,
    tessellate,
};

/// Constant curvature segment. Positive curvature turns left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Arc {
    #[serde(flatten)]
    header: Header,
    curvature: f64,
}

impl Arc {
    pub fn new(header: Header, curvature: f64) -> Result<Self, Error> {
        if curvature == 0.0 || !curvature.is_finite() {
            return Err(Error::DegenerateCurvature(curvature));
        }
        Ok(Self { header, curvature })
    }

    pub fn curvature(&self) -> f64 {
        self.curvature
    }

    /// Signed radius, `1 / curvature`.
    pub fn radius(&self) -> f64 {
        self.curvature.recip()
    }
}

impl Curve for Arc {
    fn header(&self) -> &Header {
        &self.header
    }

    fn get_xy(&self, s: f64) -> Point<f64> {
        let h = &self.header;
        let angle = (s - h.s0) * self.curvature - FRAC_PI_2;
        let r = self.radius();
        Point {
            x: r * ((h.hdg0 + angle).cos() - h.hdg0.sin()) + h.x0,
            y: r * ((h.hdg0 + angle).sin() + h.hdg0.cos()) + h.y0,
        }
    }

    fn get_grad(&self, s: f64) -> Point<f64> {
        let angle = FRAC_PI_2 - self.curvature * (s - self.header.s0) - self.header.hdg0;
        Point {
            x: angle.sin(),
            y: angle.cos(),
        }
    }

    fn approximate_linear(&self, eps: f64) -> Vec<f64> {
        tessellate::uniform(self.header.s0, self.header.length, eps)
    }
}

impl Variant for Arc {
    const KIND: Kind = Kind::Arc;

    fn decode_trailer(header: Header, reader: &mut Reader) -> Result<Self, Error> {
        Self::new(header, reader.read_f64()?)
    }

    fn encode_trailer(&self, writer: &mut Writer) -> Result<(), BoundsError> {
        writer.write_f64(self.curvature)
    }
}
