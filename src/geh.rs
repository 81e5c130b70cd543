/// Computes the GEH statistic between two hourly traffic volumes.
///
/// See: https://en.wikipedia.org/wiki/GEH_statistic
///
/// `model` is the modelled volume, `count` the observed count. Returns 0 when
/// the denominator is zero, and clamps a negative radicand to 0 rather than
/// producing a NaN.
pub fn geh(model: f64, count: f64) -> f64 {
    let denominator = (model + count) / 2.0;
    if denominator == 0.0 {
        return 0.0;
    }

    let numerator = (model - count) * (model - count);
    let quotient = numerator / denominator;

    if quotient < 0.0 {
        return 0.0;
    }

    return quotient.sqrt();
}
