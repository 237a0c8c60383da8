//! Reference line of a road: consecutive geometries ordered by `s0`.
//!
//! Binary framing: `length` (f64), geometry count (u64), then each record as
//! laid out in [`crate::record`].

use crate::{
    config::{CodecConfig, SamplingConfig},
    cursor::{Reader, Writer},
    geometry::Point,
    record::{self, Curve, Record, HEADER_SIZE},
    verboser::{self, Message, Silent},
    Float,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Record(#[from] record::Error),
    #[error("{count} geometries cannot fit in the remaining {remaining} bytes")]
    TooManyGeometries { count: u64, remaining: usize },
    #[error("reference line length {0} is not a positive finite number")]
    InvalidLength(f64),
    #[error("more than one geometry starts at s = {s0}")]
    DuplicateStart { s0: f64 },
}

impl From<crate::cursor::BoundsError> for Error {
    fn from(value: crate::cursor::BoundsError) -> Self {
        Error::Record(value.into())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferenceLine {
    length: f64,
    geometries: Vec<Record>,
}

impl ReferenceLine {
    pub fn new(length: f64) -> Self {
        Self {
            length,
            geometries: Vec::new(),
        }
    }

    pub fn from_geometries(length: f64, geometries: impl IntoIterator<Item = Record>) -> Self {
        let mut line = Self::new(length);
        for geometry in geometries {
            line.insert(geometry);
        }
        line
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Geometries in ascending `s0` order.
    pub fn geometries(&self) -> &[Record] {
        &self.geometries
    }

    /// Adds a geometry, replacing and returning any geometry with the same `s0`.
    pub fn insert(&mut self, geometry: Record) -> Option<Record> {
        let s0 = geometry.header().s0();
        match self
            .geometries
            .binary_search_by(|g| g.header().s0().total_cmp(&s0))
        {
            Ok(idx) => Some(std::mem::replace(&mut self.geometries[idx], geometry)),
            Err(idx) => {
                self.geometries.insert(idx, geometry);
                None
            }
        }
    }

    fn index_at(&self, s: f64) -> Option<usize> {
        if self.geometries.is_empty() {
            None
        } else {
            let after = self.geometries.partition_point(|g| g.header().s0() <= s);
            Some(after.saturating_sub(1))
        }
    }

    /// Geometry with the greatest `s0 <= s`, or the first one when `s` lies
    /// before every geometry.
    pub fn geometry_at(&self, s: f64) -> Option<&Record> {
        self.index_at(s).map(|idx| &self.geometries[idx])
    }

    pub fn get_xy(&self, s: f64) -> Option<Point<f64>> {
        self.geometry_at(s).map(|g| g.get_xy(s))
    }

    pub fn get_grad(&self, s: f64) -> Option<Point<f64>> {
        self.geometry_at(s).map(|g| g.get_grad(s))
    }

    pub fn approximate_linear(&self, eps: f64, s_start: f64, s_end: f64) -> Vec<f64> {
        self.approximate_linear_with(eps, s_start, s_end, &mut Silent)
    }

    /// Ascending arc length samples of `[s_start, s_end]`, built from the
    /// samples of every geometry overlapping the range.
    ///
    /// Empty when the range is empty or there are no geometries.
    pub fn approximate_linear_with(
        &self,
        eps: f64,
        s_start: f64,
        s_end: f64,
        verboser: &mut impl verboser::Verboser,
    ) -> Vec<f64> {
        let (s_start, s_end) = if s_start <= s_end {
            (s_start, s_end)
        } else {
            (s_end, s_start)
        };
        let Some(first) = self.index_at(s_start) else {
            return Vec::new();
        };
        if s_start == s_end {
            return Vec::new();
        }
        let last = self
            .geometries
            .partition_point(|g| g.header().s0() < s_end)
            .max(first + 1);

        let mut samples = vec![s_start];
        for (idx, geometry) in self.geometries[first..last].iter().enumerate() {
            let mut geometry_samples = geometry.approximate_linear(eps);
            verboser.verbose(Message::Sampled {
                index: first + idx,
                samples: geometry_samples.len(),
            });
            // the end of a geometry is the start of the next one
            if first + idx + 1 < last {
                geometry_samples.pop();
            }
            samples.extend(
                geometry_samples
                    .into_iter()
                    .filter(|s| *s > s_start && *s < s_end),
            );
        }
        samples.push(s_end);
        samples.sort_by(f64::total_cmp);
        samples.dedup();
        samples
    }

    /// Points of the linear approximation of `[s_start, s_end]`.
    pub fn polyline(&self, s_start: f64, s_end: f64, eps: f64) -> Vec<Point<f64>> {
        self.approximate_linear(eps, s_start, s_end)
            .into_iter()
            .filter_map(|s| self.get_xy(s))
            .collect()
    }

    /// Arc length in `[0, length]` whose point lies closest to `point`.
    ///
    /// The line is first scanned every `config.eps`, then refined by golden
    /// section search around the closest sample.
    pub fn match_point(&self, point: Point<f64>, config: &SamplingConfig) -> Option<f64> {
        if self.is_empty() || self.length.is_nan() || self.length <= 0.0 {
            return None;
        }
        let distance = |s: f64| {
            self.get_xy(s)
                .map_or(f64::INFINITY, |p| p.sq_distance(&point))
        };
        let coarse = self.approximate_linear(config.eps, 0.0, self.length);
        let (best, _) = coarse
            .iter()
            .map(|s| distance(*s))
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))?;
        let lo = coarse[best.saturating_sub(1)];
        let hi = coarse[(best + 1).min(coarse.len() - 1)];
        Some(golden_section_search(distance, lo, hi, config.match_tolerance))
    }

    pub fn encoded_size(&self) -> usize {
        2 * 8 + self.geometries.iter().map(Record::encoded_size).sum::<usize>()
    }

    pub fn encode(
        &self,
        writer: &mut Writer,
        verboser: &mut impl verboser::Verboser,
    ) -> Result<(), Error> {
        let start = writer.position();
        let result = self.encode_fields(writer, verboser);
        if result.is_err() {
            writer.rewind(start);
        }
        result
    }

    fn encode_fields(
        &self,
        writer: &mut Writer,
        verboser: &mut impl verboser::Verboser,
    ) -> Result<(), Error> {
        writer.write_f64(self.length)?;
        writer.write_u64(self.geometries.len() as u64)?;
        for (index, geometry) in self.geometries.iter().enumerate() {
            let offset = writer.position();
            geometry.encode(writer)?;
            verboser.verbose(Message::Encoded {
                index,
                offset,
                kind: geometry.kind(),
            });
        }
        Ok(())
    }

    /// Decodes a whole reference line. On failure the reader is left where
    /// the line started and nothing of it should be used.
    ///
    /// Fails with [`Error::DuplicateStart`] rather than dropping a geometry
    /// that starts where an earlier one does.
    pub fn decode(
        reader: &mut Reader,
        verboser: &mut impl verboser::Verboser,
    ) -> Result<Self, Error> {
        let start = reader.position();
        let result = Self::decode_fields(reader, verboser);
        if result.is_err() {
            reader.rewind(start);
        }
        result
    }

    fn decode_fields(
        reader: &mut Reader,
        verboser: &mut impl verboser::Verboser,
    ) -> Result<Self, Error> {
        let length = reader.read_f64()?;
        if !length.is_finite() || length <= 0.0 {
            return Err(Error::InvalidLength(length));
        }
        let count = reader.read_u64()?;
        let remaining = reader.remaining();
        let capacity = usize::try_from(count)
            .ok()
            .filter(|count| count.saturating_mul(HEADER_SIZE) <= remaining)
            .ok_or(Error::TooManyGeometries { count, remaining })?;

        let mut line = Self {
            length,
            geometries: Vec::with_capacity(capacity),
        };
        for index in 0..capacity {
            let offset = reader.position();
            let geometry = Record::decode(reader)?;
            verboser.verbose(Message::Decoded {
                index,
                offset,
                kind: geometry.kind(),
            });
            let s0 = geometry.header().s0();
            if line.insert(geometry).is_some() {
                return Err(Error::DuplicateStart { s0 });
            }
        }
        Ok(line)
    }

    pub fn to_bytes(&self, config: &CodecConfig) -> Result<Vec<u8>, Error> {
        self.to_bytes_with(config, &mut Silent)
    }

    pub fn to_bytes_with(
        &self,
        config: &CodecConfig,
        verboser: &mut impl verboser::Verboser,
    ) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0; self.encoded_size()];
        self.encode(&mut config.writer(&mut buf), verboser)?;
        Ok(buf)
    }

    pub fn from_bytes(
        bytes: &[u8],
        config: &CodecConfig,
        verboser: &mut impl verboser::Verboser,
    ) -> Result<Self, Error> {
        Self::decode(&mut config.reader(bytes), verboser)
    }
}

/// Minimum of a unimodal `f` on `[lo, hi]`, to within `tolerance`.
fn golden_section_search<T: Float>(f: impl Fn(T) -> T, mut lo: T, mut hi: T, tolerance: T) -> T {
    let tolerance = tolerance.abs().max(T::EPSILON);
    let mut c = hi - (hi - lo) * T::INV_PHI;
    let mut d = lo + (hi - lo) * T::INV_PHI;
    let mut fc = f(c);
    let mut fd = f(d);
    while (hi - lo).abs() > tolerance {
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - (hi - lo) * T::INV_PHI;
            fc = f(c);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + (hi - lo) * T::INV_PHI;
            fd = f(d);
        }
    }
    (lo + hi) * T::HALF
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;
    use crate::{cursor::ByteOrder, Arc, Header, Line, Spiral};
    use approx::assert_abs_diff_eq;

    /// 10 m east, a left quarter circle of radius 10, then 10 m north.
    fn sample_line() -> ReferenceLine {
        let quarter = 10.0 * FRAC_PI_2;
        ReferenceLine::from_geometries(
            20.0 + quarter,
            [
                Record::from(Arc::new(Header::new(10.0, 10.0, 0.0, 0.0, quarter).unwrap(), 0.1).unwrap()),
                Record::from(Line::new(Header::new(10.0 + quarter, 20.0, 10.0, FRAC_PI_2, 10.0).unwrap())),
                Record::from(Line::new(Header::new(0.0, 0.0, 0.0, 0.0, 10.0).unwrap())),
            ],
        )
    }

    #[test]
    fn geometries_are_sorted() {
        let line = sample_line();
        let starts: Vec<f64> = line.geometries().iter().map(|g| g.header().s0()).collect();
        assert_eq!(starts, vec![0.0, 10.0, 10.0 + 10.0 * FRAC_PI_2]);
    }

    #[test]
    fn insert_replaces_same_start() {
        let mut line = sample_line();
        let replacement = Record::from(Line::new(Header::new(0.0, 1.0, 1.0, 0.0, 10.0).unwrap()));
        let old = line.insert(replacement.clone()).unwrap();
        assert_eq!(old.header().x0(), 0.0);
        assert_eq!(line.len(), 3);
        assert_eq!(line.geometries()[0], replacement);
    }

    #[test]
    fn geometry_lookup() {
        let line = sample_line();
        assert!(ReferenceLine::new(5.0).geometry_at(1.0).is_none());
        assert_eq!(line.geometry_at(-5.0).unwrap().header().s0(), 0.0);
        assert_eq!(line.geometry_at(9.99).unwrap().kind(), record::Kind::Line);
        assert_eq!(line.geometry_at(10.0).unwrap().kind(), record::Kind::Arc);
        assert_eq!(line.geometry_at(1000.0).unwrap().header().s0(), 10.0 + 10.0 * FRAC_PI_2);
    }

    #[test]
    fn evaluation_is_continuous_across_geometries() {
        let line = sample_line();
        for s in [10.0, 10.0 + 10.0 * FRAC_PI_2] {
            let before = line.get_xy(s - 1e-9).unwrap();
            let after = line.get_xy(s + 1e-9).unwrap();
            assert_abs_diff_eq!(before.x, after.x, epsilon = 1e-6);
            assert_abs_diff_eq!(before.y, after.y, epsilon = 1e-6);
        }
        let end = line.get_xy(line.length()).unwrap();
        assert_abs_diff_eq!(end.x, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(end.y, 20.0, epsilon = 1e-9);
        let grad = line.get_grad(15.0).unwrap();
        assert_abs_diff_eq!(grad.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn range_tessellation() {
        let line = sample_line();
        assert!(line.approximate_linear(1.0, 3.0, 3.0).is_empty());
        assert!(ReferenceLine::new(1.0).approximate_linear(1.0, 0.0, 1.0).is_empty());

        let samples = line.approximate_linear(4.0, 2.0, 30.0);
        assert_eq!(samples.first(), Some(&2.0));
        assert_eq!(samples.last(), Some(&30.0));
        for pair in samples.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[1] - pair[0] <= 4.0 + 1e-9);
        }
        assert!(samples.contains(&10.0));
        assert!(samples.contains(&(10.0 + 10.0 * FRAC_PI_2)));
        assert_eq!(samples, line.approximate_linear(4.0, 30.0, 2.0));
    }

    #[test]
    fn whole_line_tessellation() {
        let line = sample_line();
        let samples = line.approximate_linear(5.0, 0.0, line.length());
        let quarter = 10.0 * FRAC_PI_2;
        let expected = vec![
            0.0,
            5.0,
            10.0,
            15.0,
            20.0,
            25.0,
            10.0 + quarter,
            15.0 + quarter,
            20.0 + quarter,
        ];
        assert_eq!(samples.len(), expected.len());
        for (a, b) in samples.iter().zip(&expected) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
        assert_eq!(line.polyline(0.0, line.length(), 5.0).len(), expected.len());
    }

    #[test]
    fn matches_points_on_the_line() {
        let line = sample_line();
        let config = SamplingConfig::default();
        for s in [0.0, 3.3, 12.0, 20.0, 27.0] {
            let point = line.get_xy(s).unwrap();
            let found = line.match_point(point, &config).unwrap();
            assert_abs_diff_eq!(found, s, epsilon = 2e-2);
        }
        // a point off the line matches its foot point
        let found = line.match_point(Point::new(5.0, -3.0), &config).unwrap();
        assert_abs_diff_eq!(found, 5.0, epsilon = 2e-2);
        assert!(ReferenceLine::new(1.0).match_point(Point::new(0.0, 0.0), &config).is_none());
    }

    #[test]
    fn round_trip() {
        let mut line = sample_line();
        line.insert(Record::from(
            Spiral::new(Header::new(40.0, 20.0, 30.0, FRAC_PI_2, 5.0).unwrap(), 0.0, 0.1).unwrap(),
        ));
        for byte_order in [ByteOrder::Little, ByteOrder::Big] {
            let config = CodecConfig { byte_order };
            let bytes = line.to_bytes(&config).unwrap();
            assert_eq!(bytes.len(), 16 + 44 + 52 + 44 + 60);
            assert_eq!(bytes.len(), line.encoded_size());
            let decoded = ReferenceLine::from_bytes(&bytes, &config, &mut Silent).unwrap();
            assert_eq!(decoded, line);
            assert_eq!(decoded.to_bytes(&config).unwrap(), bytes);
        }
    }

    #[test]
    fn oversized_count_is_rejected() {
        let mut bytes = sample_line().to_bytes(&CodecConfig::default()).unwrap();
        bytes[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            ReferenceLine::decode(&mut reader, &mut Silent),
            Err(Error::TooManyGeometries { count: u64::MAX, .. })
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn truncated_line_is_rejected() {
        let bytes = sample_line().to_bytes(&CodecConfig::default()).unwrap();
        let truncated = &bytes[..bytes.len() - 1];
        let mut reader = Reader::new(truncated);
        assert!(matches!(
            ReferenceLine::decode(&mut reader, &mut Silent),
            Err(Error::Record(record::Error::Bounds(_)))
        ));
        assert_eq!(reader.position(), 0);
    }

    fn framed(length: f64, records: &[Record]) -> Vec<u8> {
        let mut bytes = length.to_le_bytes().to_vec();
        bytes.extend((records.len() as u64).to_le_bytes());
        for record in records {
            bytes.extend(record.to_bytes(ByteOrder::Little).unwrap());
        }
        bytes
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let first = Record::from(Line::new(Header::new(0.0, 0.0, 0.0, 0.0, 10.0).unwrap()));
        let second = Record::from(Line::new(Header::new(0.0, 9.0, 0.0, 0.0, 10.0).unwrap()));
        let bytes = framed(10.0, &[first, second]);
        assert_eq!(bytes.len(), 104);
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            ReferenceLine::decode(&mut reader, &mut Silent),
            Err(Error::DuplicateStart { s0 }) if s0 == 0.0
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn invalid_length_is_rejected() {
        let line = Record::from(Line::new(Header::new(0.0, 0.0, 0.0, 0.0, 10.0).unwrap()));
        for length in [f64::NAN, f64::INFINITY, -1.0, 0.0] {
            let bytes = framed(length, std::slice::from_ref(&line));
            let mut reader = Reader::new(&bytes);
            assert!(matches!(
                ReferenceLine::decode(&mut reader, &mut Silent),
                Err(Error::InvalidLength(_))
            ));
            assert_eq!(reader.position(), 0);
        }
        let bytes = framed(10.0, &[line]);
        assert!(ReferenceLine::from_bytes(&bytes, &CodecConfig::default(), &mut Silent).is_ok());
    }

    #[test]
    fn encoding_reports_every_record() {
        struct Offsets(Vec<usize>);
        impl verboser::Verboser for Offsets {
            fn verbose(&mut self, message: Message) {
                if let Message::Encoded { offset, .. } = message {
                    self.0.push(offset);
                }
            }
        }
        let line = sample_line();
        let mut offsets = Offsets(Vec::new());
        let bytes = line
            .to_bytes_with(&CodecConfig::default(), &mut offsets)
            .unwrap();
        assert_eq!(bytes, line.to_bytes(&CodecConfig::default()).unwrap());
        assert_eq!(offsets.0, vec![16, 60, 112]);
    }

    #[test]
    fn verboser_sees_every_record() {
        struct Count(Vec<usize>);
        impl verboser::Verboser for Count {
            fn verbose(&mut self, message: Message) {
                if let Message::Decoded { offset, .. } = message {
                    self.0.push(offset);
                }
            }
        }
        let bytes = sample_line().to_bytes(&CodecConfig::default()).unwrap();
        let mut count = Count(Vec::new());
        ReferenceLine::from_bytes(&bytes, &CodecConfig::default(), &mut count).unwrap();
        assert_eq!(count.0, vec![16, 60, 112]);
    }

    #[test]
    fn golden_section_finds_minimum() {
        let min = golden_section_search(|x: f64| (x - 1.3).powi(2), -4.0, 6.0, 1e-9);
        assert_abs_diff_eq!(min, 1.3, epsilon = 1e-8);
        let min = golden_section_search(|x: f32| (x - 3.0).abs(), 2.0, 5.0, 1e-4);
        assert_abs_diff_eq!(min, 3.0, epsilon = 1e-3);
    }
}
