/// Raw move output above which the policy moves right (below its negation, left).
pub const MOVE_THRESHOLD: f32 = 0.33;

/// Raw energy output at or above which the policy uses energy.
pub const ENERGY_THRESHOLD: f32 = 0.5;

/// Turns raw `[move, energy]` network outputs into a discrete action.
///
/// The move axis becomes `-1`, `0` or `1`; the energy axis `0` or `1`.
///
/// # Examples
///
/// ```
/// use mimicry_nn::discretize_action;
///
/// assert_eq!(discretize_action([0.6, 0.7]), [1.0, 1.0]);
/// assert_eq!(discretize_action([-0.1, 0.3]), [0.0, 0.0]);
/// assert_eq!(discretize_action([-0.9, 0.9]), [-1.0, 1.0]);
/// ```
#[must_use]
pub fn discretize_action(raw: [f32; 2]) -> [f32; 2] {
    let [movement, energy] = raw;
    let movement = if movement < -MOVE_THRESHOLD {
        -1.0
    } else if movement > MOVE_THRESHOLD {
        1.0
    } else {
        0.0
    };
    let energy = if energy >= ENERGY_THRESHOLD { 1.0 } else { 0.0 };
    [movement, energy]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_exclusive_for_move_inclusive_for_energy() {
        assert_eq!(discretize_action([0.33, 0.5]), [0.0, 1.0]);
        assert_eq!(discretize_action([-0.33, 0.499]), [0.0, 0.0]);
        assert_eq!(discretize_action([0.34, 0.0]), [1.0, 0.0]);
        assert_eq!(discretize_action([-0.34, 0.0]), [-1.0, 0.0]);
    }
}
