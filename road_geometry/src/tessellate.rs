//! Arc-length stepping shared by every geometry variant.

use crate::Float;

/// Samples `[start, start + length]` every `eps`, always ending on the exact
/// endpoint.
///
/// The running value starts at `start` and grows by `eps` while it is strictly
/// below `start + length`; the endpoint is then appended. The result is
/// strictly ascending. A step that is not a positive finite number, or one
/// too small to advance the running value, stops the stepping early so the
/// call always terminates.
pub fn uniform<T: Float>(start: T, length: T, eps: T) -> Vec<T> {
    let end = start + length;
    let mut samples = Vec::new();
    if eps > T::ZERO && eps.is_finite() {
        if let Some(count) = (length / eps).ceil().to_usize() {
            samples.reserve(count.saturating_add(1));
        }
    }

    let mut s = start;
    while s < end {
        samples.push(s);
        if !(eps > T::ZERO && eps.is_finite()) {
            break;
        }
        let next = s + eps;
        if next <= s {
            break;
        }
        s = next;
    }
    samples.push(end);
    samples
}
