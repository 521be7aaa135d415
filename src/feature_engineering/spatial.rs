//! Location key feature

/// Joins `x`, `y` and `direction` into the composite location key.
///
/// Directions containing the delimiter make keys ambiguous: `(1, 2, "N_E")`
/// and a hypothetical `(1, "2_N", "E")` would both read `1_2_N_E`. Keys are
/// only ever compared for equality, and `x`/`y` are integers, so the first two
/// segments always parse back unambiguously.
pub const COMPOSITE_KEY_DELIMITER: &str = "_";

/// `"{x}_{y}_{direction}"`
pub fn x_y_direction(x: i64, y: i64, direction: &str) -> String {
    let d = COMPOSITE_KEY_DELIMITER;
    format!("{x}{d}{y}{d}{direction}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key() {
        assert_eq!(x_y_direction(1, 2, "N"), "1_2_N");
        assert_eq!(x_y_direction(0, 3, "SW"), "0_3_SW");
        assert_eq!(x_y_direction(-1, 2, "EB"), "-1_2_EB");
    }

    #[test]
    fn test_delimiter_in_direction_is_kept_verbatim() {
        assert_eq!(x_y_direction(1, 2, "N_E"), "1_2_N_E");
    }
}
