/// Absolute tolerance used when comparing percentages computed along different paths.
pub const TOLERANCE: f64 = 1e-9;

pub fn assert_are_close(a: f64, b: f64) {
    assert!(
        (a - b).abs() <= TOLERANCE * a.abs().max(b.abs()).max(1.0),
        "{} and {} are not close",
        a,
        b
    );
}
