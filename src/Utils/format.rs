/// Formats a number for on-screen labels.
///
/// Zero prints as `0`; magnitudes below `1e-5` or from `1e5` up use three-digit scientific
/// notation (`1.235e5`); everything else is printed with three decimals and trailing zeros
/// removed (`1.5`, `-2`).
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs();
    if !(1e-5..1e5).contains(&magnitude) {
        return format!("{:.3e}", value);
    }
    let fixed = format!("{:.3}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// number of grid cells across the visible width
pub const CELL_NUMBER: f64 = 10.0;

/// Grid spacing in world units: the first of 1, 2, 5 and 10 times the decade of
/// `world_width / CELL_NUMBER` that is not smaller than it.
pub fn grid_step(world_width: f64) -> f64 {
    let raw = world_width / CELL_NUMBER;
    if !(raw.is_finite() && raw > 0.0) {
        return 1.0;
    }
    let base = 10f64.powf(raw.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .into_iter()
        .map(|m| m * base)
        .find(|&step| step >= raw)
        .unwrap_or(10.0 * base)
}
