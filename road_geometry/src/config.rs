use serde::{Deserialize, Serialize};

use crate::cursor::{ByteOrder, Reader, Writer};

/// How records are laid out in a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub byte_order: ByteOrder,
}

impl CodecConfig {
    pub fn reader<'a>(&self, buf: &'a [u8]) -> Reader<'a> {
        Reader::with_order(buf, self.byte_order)
    }

    pub fn writer<'a>(&self, buf: &'a mut [u8]) -> Writer<'a> {
        Writer::with_order(buf, self.byte_order)
    }
}

/// Sampling and matching tolerances used when evaluating a reference line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Arc length step of the linear approximation, in meters.
    pub eps: f64,
    /// Arc length tolerance of nearest point matching, in meters.
    pub match_tolerance: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            eps: 0.1,
            match_tolerance: 1e-2,
        }
    }
}
