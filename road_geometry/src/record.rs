//! Geometry records of a road reference line.
//!
//! Every record starts with the same 44 byte header:
//!
//! | offset | size | field    | type |
//! |--------|------|----------|------|
//! | 0      | 8    | `s0`     | f64  |
//! | 8      | 8    | `x0`     | f64  |
//! | 16     | 8    | `y0`     | f64  |
//! | 24     | 8    | `hdg0`   | f64  |
//! | 32     | 8    | `length` | f64  |
//! | 40     | 4    | kind tag | u32  |
//!
//! followed by a trailer whose layout depends on the [`Kind`].

mod arc;
mod line;
mod param_poly3;
mod spiral;

pub use arc::Arc;
pub use line::Line;
pub use param_poly3::ParamPoly3;
pub use spiral::Spiral;

use std::fmt;

use serde::Serialize;

use crate::{
    cursor::{BoundsError, ByteOrder, Reader, Writer},
    geometry::Point,
};

/// Size in bytes of the header shared by every record.
pub const HEADER_SIZE: usize = 5 * 8 + 4;

#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error("Geometry kind tag {0} is not mapped to any geometry")]
    UnmappedKind(u32),
    #[error("Arc curvature must be finite and non-zero, found {0}")]
    DegenerateCurvature(f64),
    #[error("Geometry length must be finite and positive, found {0}")]
    InvalidLength(f64),
    #[error("Geometry parameter `{0}` must be finite")]
    NonFiniteParameter(&'static str),
    #[error("Range flag must be 0 or 1, found {0}")]
    InvalidFlag(u8),
}

/// Discriminant of the concrete geometry stored in a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Kind {
    Line,
    Arc,
    Spiral,
    ParamPoly3,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Line, Kind::Arc, Kind::Spiral, Kind::ParamPoly3];

    /// Binary tag written after the header fields.
    pub const fn tag(self) -> u32 {
        match self {
            Kind::Line => 1,
            Kind::Arc => 2,
            Kind::Spiral => 3,
            Kind::ParamPoly3 => 4,
        }
    }

    pub fn from_tag(tag: u32) -> Result<Self, Error> {
        match tag {
            1 => Ok(Kind::Line),
            2 => Ok(Kind::Arc),
            3 => Ok(Kind::Spiral),
            4 => Ok(Kind::ParamPoly3),
            other => Err(Error::UnmappedKind(other)),
        }
    }

    /// Bytes following the header for this kind.
    pub const fn trailer_size(self) -> usize {
        match self {
            Kind::Line => 0,
            Kind::Arc => 8,
            Kind::Spiral => 2 * 8,
            Kind::ParamPoly3 => 8 * 8 + 1,
        }
    }

    pub const fn encoded_size(self) -> usize {
        HEADER_SIZE + self.trailer_size()
    }
}

impl TryFrom<u32> for Kind {
    type Error = Error;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        Kind::from_tag(tag)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Line => "line",
            Kind::Arc => "arc",
            Kind::Spiral => "spiral",
            Kind::ParamPoly3 => "paramPoly3",
        })
    }
}

/// Placement of a geometry along the reference line and in the plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Header {
    s0: f64,
    x0: f64,
    y0: f64,
    hdg0: f64,
    length: f64,
}

impl Header {
    pub fn new(s0: f64, x0: f64, y0: f64, hdg0: f64, length: f64) -> Result<Self, Error> {
        if !(length.is_finite() && length > 0.0) {
            return Err(Error::InvalidLength(length));
        }
        Ok(Self {
            s0,
            x0,
            y0,
            hdg0,
            length,
        })
    }

    /// Arc length at which the geometry starts.
    pub fn s0(&self) -> f64 {
        self.s0
    }

    pub fn x0(&self) -> f64 {
        self.x0
    }

    pub fn y0(&self) -> f64 {
        self.y0
    }

    /// Heading at `s0`, in radians.
    pub fn hdg0(&self) -> f64 {
        self.hdg0
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Arc length at which the geometry ends.
    pub fn end(&self) -> f64 {
        self.s0 + self.length
    }

    pub fn start(&self) -> Point<f64> {
        Point::new(self.x0, self.y0)
    }

    fn decode(reader: &mut Reader) -> Result<(Self, Kind), Error> {
        let s0 = reader.read_f64()?;
        let x0 = reader.read_f64()?;
        let y0 = reader.read_f64()?;
        let hdg0 = reader.read_f64()?;
        let length = reader.read_f64()?;
        let kind = Kind::from_tag(reader.read_u32()?)?;
        Ok((Self::new(s0, x0, y0, hdg0, length)?, kind))
    }

    fn encode(&self, kind: Kind, writer: &mut Writer) -> Result<(), BoundsError> {
        writer.write_f64(self.s0)?;
        writer.write_f64(self.x0)?;
        writer.write_f64(self.y0)?;
        writer.write_f64(self.hdg0)?;
        writer.write_f64(self.length)?;
        writer.write_u32(kind.tag())
    }
}

/// Evaluation shared by every geometry.
pub trait Curve {
    fn header(&self) -> &Header;

    /// Planar position at arc length `s`.
    ///
    /// Meaningful on `[s0, s0 + length]`; outside that range the geometry is
    /// extrapolated.
    fn get_xy(&self, s: f64) -> Point<f64>;

    /// Unit tangent at arc length `s`.
    fn get_grad(&self, s: f64) -> Point<f64>;

    /// Ascending arc length samples covering the whole geometry, at most
    /// `eps` apart.
    fn approximate_linear(&self, eps: f64) -> Vec<f64>;
}

/// Trailer codec of a concrete geometry.
pub(crate) trait Variant: Curve + Sized {
    const KIND: Kind;

    fn decode_trailer(header: Header, reader: &mut Reader) -> Result<Self, Error>;

    fn encode_trailer(&self, writer: &mut Writer) -> Result<(), BoundsError>;
}

fn finite(name: &'static str, value: f64) -> Result<f64, Error> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::NonFiniteParameter(name))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Record {
    Line(Line),
    Arc(Arc),
    Spiral(Spiral),
    ParamPoly3(ParamPoly3),
}

impl Record {
    /// Decodes one record at the reader position.
    ///
    /// On failure the reader is left where the record started.
    pub fn decode(reader: &mut Reader) -> Result<Self, Error> {
        let start = reader.position();
        let record = Self::decode_fields(reader);
        if record.is_err() {
            reader.rewind(start);
        }
        record
    }

    fn decode_fields(reader: &mut Reader) -> Result<Self, Error> {
        let (header, kind) = Header::decode(reader)?;
        Ok(match kind {
            Kind::Line => Record::Line(Line::decode_trailer(header, reader)?),
            Kind::Arc => Record::Arc(Arc::decode_trailer(header, reader)?),
            Kind::Spiral => Record::Spiral(Spiral::decode_trailer(header, reader)?),
            Kind::ParamPoly3 => Record::ParamPoly3(ParamPoly3::decode_trailer(header, reader)?),
        })
    }

    /// Encodes the record at the writer position.
    ///
    /// On failure the writer is left where the record started; bytes already
    /// written past that point are unspecified.
    pub fn encode(&self, writer: &mut Writer) -> Result<(), Error> {
        let start = writer.position();
        let result = self.header().encode(self.kind(), writer).and_then(|()| match self {
            Record::Line(line) => line.encode_trailer(writer),
            Record::Arc(arc) => arc.encode_trailer(writer),
            Record::Spiral(spiral) => spiral.encode_trailer(writer),
            Record::ParamPoly3(poly) => poly.encode_trailer(writer),
        });
        if result.is_err() {
            writer.rewind(start);
        }
        result.map_err(Error::from)
    }

    pub fn from_bytes(bytes: &[u8], order: ByteOrder) -> Result<Self, Error> {
        Self::decode(&mut Reader::with_order(bytes, order))
    }

    /// Encodes into a freshly allocated buffer of [`Self::encoded_size`] bytes.
    pub fn to_bytes(&self, order: ByteOrder) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0; self.encoded_size()];
        self.encode(&mut Writer::with_order(&mut buf, order))?;
        Ok(buf)
    }

    pub fn kind(&self) -> Kind {
        match self {
            Record::Line(_) => Line::KIND,
            Record::Arc(_) => Arc::KIND,
            Record::Spiral(_) => Spiral::KIND,
            Record::ParamPoly3(_) => ParamPoly3::KIND,
        }
    }

    pub fn encoded_size(&self) -> usize {
        self.kind().encoded_size()
    }

    fn as_curve(&self) -> &dyn Curve {
        match self {
            Record::Line(line) => line,
            Record::Arc(arc) => arc,
            Record::Spiral(spiral) => spiral,
            Record::ParamPoly3(poly) => poly,
        }
    }
}

impl Curve for Record {
    fn header(&self) -> &Header {
        self.as_curve().header()
    }

    fn get_xy(&self, s: f64) -> Point<f64> {
        self.as_curve().get_xy(s)
    }

    fn get_grad(&self, s: f64) -> Point<f64> {
        self.as_curve().get_grad(s)
    }

    fn approximate_linear(&self, eps: f64) -> Vec<f64> {
        self.as_curve().approximate_linear(eps)
    }
}

impl From<Line> for Record {
    fn from(value: Line) -> Self {
        Record::Line(value)
    }
}

impl From<Arc> for Record {
    fn from(value: Arc) -> Self {
        Record::Arc(value)
    }
}

impl From<Spiral> for Record {
    fn from(value: Spiral) -> Self {
        Record::Spiral(value)
    }
}

impl From<ParamPoly3> for Record {
    fn from(value: ParamPoly3) -> Self {
        Record::ParamPoly3(value)
    }
}

/// Decodes consecutive records until the buffer is exhausted.
///
/// Yields at most one error, after which the iterator is finished: offsets
/// past a failed record are meaningless.
pub fn records<'r, 'a>(reader: &'r mut Reader<'a>) -> Records<'r, 'a> {
    Records {
        reader,
        failed: false,
    }
}

pub struct Records<'r, 'a> {
    reader: &'r mut Reader<'a>,
    failed: bool,
}

impl Iterator for Records<'_, '_> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_empty() {
            return None;
        }
        let record = Record::decode(self.reader);
        self.failed = record.is_err();
        Some(record)
    }
}

impl std::iter::FusedIterator for Records<'_, '_> {}
