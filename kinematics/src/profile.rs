/// Quintic (minimum-jerk) blend from 0 to 1 over `total` seconds.
///
/// Clamps to 0 before the start and to 1 once `t` reaches `total`. In between,
/// with `u = t / total`, returns `10u³ - 15u⁴ + 6u⁵`, which has zero velocity
/// and acceleration at both ends.
pub fn quintic(t: f64, total: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= total {
        return 1.0;
    }

    let u = t / total;
    let u3 = u * u * u;
    (u3 * (10.0 + u * (-15.0 + 6.0 * u))).min(1.0)
}
