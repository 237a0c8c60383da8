use std::ops::{AddAssign, Mul};

/// (weight, abscissa) pairs of the 8 point Gauss-Legendre rule on [-1, 1].
const GAUSS_LEGENDRE_COEFFS_8: [(f64, f64); 8] = [
    (0.362_683_783_378_362, -0.183_434_642_495_649_8),
    (0.362_683_783_378_362, 0.183_434_642_495_649_8),
    (0.313_706_645_877_887_3, -0.525_532_409_916_329),
    (0.313_706_645_877_887_3, 0.525_532_409_916_329),
    (0.222_381_034_453_374_5, -0.796_666_477_413_626_7),
    (0.222_381_034_453_374_5, 0.796_666_477_413_626_7),
    (0.101_228_536_290_376_3, -0.960_289_856_497_536_3),
    (0.101_228_536_290_376_3, 0.960_289_856_497_536_3),
];

/// Integrates `f` from `a` to `b` over `panels` equal panels.
///
/// `b < a` yields the negated integral.
pub(crate) fn integrate<V, F>(a: f64, b: f64, panels: usize, f: F) -> V
where
    V: Copy + Default + AddAssign + Mul<f64, Output = V>,
    F: Fn(f64) -> V,
{
    let panels = panels.max(1);
    let width = (b - a) / panels as f64;
    let half = 0.5 * width;
    let mut sum = V::default();
    for panel in 0..panels {
        let mid = a + (panel as f64 + 0.5) * width;
        for (wi, xi) in GAUSS_LEGENDRE_COEFFS_8 {
            sum += f(mid + xi * half) * (wi * half);
        }
    }
    sum
}
