//! Bounds-checked positions over byte buffers.
//!
//! Every read and write checks the remaining length before touching the
//! buffer. A failed access returns [`BoundsError`] and leaves the position
//! where it was.

use serde::{Deserialize, Serialize};

/// Byte order of every numeric field in a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("need {needed} bytes at offset {offset} but only {remaining} remain")]
pub struct BoundsError {
    pub offset: usize,
    pub needed: usize,
    pub remaining: usize,
}

/// Read cursor over an immutable buffer.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_order(buf, ByteOrder::default())
    }

    pub fn with_order(buf: &'a [u8], order: ByteOrder) -> Self {
        Self { buf, pos: 0, order }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Moves back to a position previously returned by [`Self::position`].
    pub(crate) fn rewind(&mut self, pos: usize) {
        debug_assert!(pos <= self.buf.len());
        self.pos = pos;
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], BoundsError> {
        let bytes = self
            .buf
            .get(self.pos..)
            .and_then(|rest| rest.get(..N))
            .ok_or(BoundsError {
                offset: self.pos,
                needed: N,
                remaining: self.remaining(),
            })?;
        let mut out = [0; N];
        out.copy_from_slice(bytes);
        self.pos += N;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, BoundsError> {
        self.take::<1>().map(|[b]| b)
    }

    pub fn read_u32(&mut self) -> Result<u32, BoundsError> {
        let bytes = self.take()?;
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        })
    }

    pub fn read_u64(&mut self) -> Result<u64, BoundsError> {
        let bytes = self.take()?;
        Ok(match self.order {
            ByteOrder::Little => u64::from_le_bytes(bytes),
            ByteOrder::Big => u64::from_be_bytes(bytes),
        })
    }

    pub fn read_f64(&mut self) -> Result<f64, BoundsError> {
        let bytes = self.take()?;
        Ok(match self.order {
            ByteOrder::Little => f64::from_le_bytes(bytes),
            ByteOrder::Big => f64::from_be_bytes(bytes),
        })
    }
}

/// Write cursor over a caller-sized buffer.
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self::with_order(buf, ByteOrder::default())
    }

    pub fn with_order(buf: &'a mut [u8], order: ByteOrder) -> Self {
        Self { buf, pos: 0, order }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub(crate) fn rewind(&mut self, pos: usize) {
        debug_assert!(pos <= self.buf.len());
        self.pos = pos;
    }

    fn put<const N: usize>(&mut self, bytes: [u8; N]) -> Result<(), BoundsError> {
        let remaining = self.remaining();
        let offset = self.pos;
        let slot = self
            .buf
            .get_mut(offset..)
            .and_then(|rest| rest.get_mut(..N))
            .ok_or(BoundsError {
                offset,
                needed: N,
                remaining,
            })?;
        slot.copy_from_slice(&bytes);
        self.pos += N;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), BoundsError> {
        self.put([value])
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), BoundsError> {
        self.put(match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        })
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), BoundsError> {
        self.put(match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        })
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), BoundsError> {
        self.put(match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        })
    }
}
