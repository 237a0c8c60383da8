use serde::Serialize;

use super::{finite, Curve, Error, Header, Kind, Variant};
use crate::{
    cursor::{BoundsError, Reader, Writer},
    geometry::Point,
    quadrature, tessellate,
};

/// Quadrature panels used over the whole parameter range.
const PANELS: f64 = 16.0;
const MAX_ITERATIONS: usize = 64;

/// Parametric cubic curve in the local frame of its start point.
///
/// The local curve is `u(p) = a_u + b_u p + c_u p² + d_u p³` and likewise for
/// `v`, rotated by `hdg0` and moved to `(x0, y0)`. With a normalized range `p`
/// runs over `[0, 1]`, otherwise over `[0, length]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ParamPoly3 {
    #[serde(flatten)]
    header: Header,
    u: [f64; 4],
    v: [f64; 4],
    normalized: bool,
    #[serde(skip)]
    curve_length: f64,
}

impl ParamPoly3 {
    /// `u` and `v` hold the coefficients `[a, b, c, d]` of each polynomial.
    pub fn new(header: Header, u: [f64; 4], v: [f64; 4], normalized: bool) -> Result<Self, Error> {
        const NAMES: [&str; 8] = ["a_u", "b_u", "c_u", "d_u", "a_v", "b_v", "c_v", "d_v"];
        for (name, value) in NAMES.into_iter().zip(u.into_iter().chain(v)) {
            finite(name, value)?;
        }
        let mut poly = Self {
            header,
            u,
            v,
            normalized,
            curve_length: 0.0,
        };
        poly.curve_length = poly.arc_length(poly.p_max());
        Ok(poly)
    }

    pub fn u(&self) -> [f64; 4] {
        self.u
    }

    pub fn v(&self) -> [f64; 4] {
        self.v
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// End of the parameter range.
    pub fn p_max(&self) -> f64 {
        if self.normalized {
            1.0
        } else {
            self.header.length
        }
    }

    /// Arc length of the local polynomial over the whole parameter range.
    ///
    /// Usually close to `length`; positions are rescaled so that `s0 + length`
    /// always maps to `p_max`.
    pub fn curve_length(&self) -> f64 {
        self.curve_length
    }

    fn local(&self, p: f64) -> Point<f64> {
        Point {
            x: horner(&self.u, p),
            y: horner(&self.v, p),
        }
    }

    fn local_deriv(&self, p: f64) -> Point<f64> {
        Point {
            x: horner_deriv(&self.u, p),
            y: horner_deriv(&self.v, p),
        }
    }

    fn speed(&self, p: f64) -> f64 {
        self.local_deriv(p).norm()
    }

    /// Signed arc length of the local curve from 0 to `p`.
    fn arc_length(&self, p: f64) -> f64 {
        let panels = (p.abs() / self.p_max() * PANELS).ceil().clamp(1.0, 64.0 * PANELS) as usize;
        quadrature::integrate(0.0, p, panels, |q| self.speed(q))
    }

    /// Parameter at arc length `s`.
    pub fn param_at(&self, s: f64) -> f64 {
        let fraction = (s - self.header.s0) / self.header.length;
        let guess = fraction * self.p_max();
        if !(self.curve_length > 0.0) || !guess.is_finite() {
            return guess;
        }
        let target = fraction * self.curve_length;
        let tolerance = 1e-12 * self.curve_length.max(1.0);

        // The arc length is monotonic in p, so a bracket is found by doubling.
        let (mut lo, mut hi) = (0.0_f64, self.p_max());
        let mut width = self.p_max();
        for _ in 0..MAX_ITERATIONS {
            if self.arc_length(lo) <= target {
                break;
            }
            lo -= width;
            width *= 2.0;
        }
        let mut width = self.p_max();
        for _ in 0..MAX_ITERATIONS {
            if self.arc_length(hi) >= target {
                break;
            }
            hi += width;
            width *= 2.0;
        }

        let mut p = guess.clamp(lo, hi);
        for _ in 0..MAX_ITERATIONS {
            let error = self.arc_length(p) - target;
            if error.abs() <= tolerance {
                break;
            }
            if error > 0.0 {
                hi = p;
            } else {
                lo = p;
            }
            let speed = self.speed(p);
            let newton = p - error / speed;
            p = if speed > 0.0 && newton > lo && newton < hi {
                newton
            } else {
                0.5 * (lo + hi)
            };
        }
        p
    }
}

fn horner(c: &[f64; 4], p: f64) -> f64 {
    ((c[3] * p + c[2]) * p + c[1]) * p + c[0]
}

fn horner_deriv(c: &[f64; 4], p: f64) -> f64 {
    (3.0 * c[3] * p + 2.0 * c[2]) * p + c[1]
}

impl Curve for ParamPoly3 {
    fn header(&self) -> &Header {
        &self.header
    }

    fn get_xy(&self, s: f64) -> Point<f64> {
        let p = self.param_at(s);
        self.header.start() + self.local(p).rotate(self.header.hdg0)
    }

    fn get_grad(&self, s: f64) -> Point<f64> {
        let p = self.param_at(s);
        self.local_deriv(p)
            .normalized()
            .or_else(|| (self.local(self.p_max()) - self.local(0.0)).normalized())
            .unwrap_or(Point::new(1.0, 0.0))
            .rotate(self.header.hdg0)
    }

    fn approximate_linear(&self, eps: f64) -> Vec<f64> {
        tessellate::uniform(self.header.s0, self.header.length, eps)
    }
}

impl Variant for ParamPoly3 {
    const KIND: Kind = Kind::ParamPoly3;

    fn decode_trailer(header: Header, reader: &mut Reader) -> Result<Self, Error> {
        let mut u = [0.0; 4];
        let mut v = [0.0; 4];
        for c in u.iter_mut().chain(v.iter_mut()) {
            *c = reader.read_f64()?;
        }
        let normalized = match reader.read_u8()? {
            0 => false,
            1 => true,
            flag => return Err(Error::InvalidFlag(flag)),
        };
        Self::new(header, u, v, normalized)
    }

    fn encode_trailer(&self, writer: &mut Writer) -> Result<(), BoundsError> {
        for c in self.u.iter().chain(&self.v) {
            writer.write_f64(*c)?;
        }
        writer.write_u8(u8::from(self.normalized))
    }
}
