/// Rounds `value` to two decimal places, the precision every sensor value is
/// kept at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(80.125), 80.13);
        assert_eq!(round2(10.0), 10.0);
        assert_eq!(round2(55.5549), 55.55);
    }
}
