pub mod geometry {
    pub mod point;

    pub use point::Point;
}

pub mod config;
pub mod cursor;
mod float;
mod quadrature;
pub mod record;
pub mod ref_line;
pub mod tessellate;
pub mod verboser;

pub use config::{CodecConfig, SamplingConfig};
pub use cursor::{BoundsError, ByteOrder, Reader, Writer};
pub use float::Float;
pub use record::{Arc, Curve, Header, Kind, Line, ParamPoly3, Record, Spiral};
pub use ref_line::ReferenceLine;
