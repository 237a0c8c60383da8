use crate::record::Kind;

pub enum Message {
    /// A record of the given kind was decoded at a byte offset.
    Decoded { index: usize, offset: usize, kind: Kind },
    Encoded { index: usize, offset: usize, kind: Kind },
    /// A geometry produced `samples` arc length samples.
    Sampled { index: usize, samples: usize },
}

pub trait Verboser {
    fn verbose(&mut self, message: Message);
}

pub struct Silent;

impl Verboser for Silent {
    fn verbose(&mut self, _: Message) {}
}
