//! Random chart colours.

use rand::Rng;

const FILL_ALPHA: &str = "0.7";
const BORDER_ALPHA: &str = "1";

/// Fill and border colour for one dataset. Same RGB, different alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetColor {
    pub fill: String,
    pub border: String,
}

pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> DatasetColor {
    let (r, g, b): (u8, u8, u8) = (rng.r#gen(), rng.r#gen(), rng.r#gen());
    DatasetColor {
        fill: format!("rgba({r}, {g}, {b}, {FILL_ALPHA})"),
        border: format!("rgba({r}, {g}, {b}, {BORDER_ALPHA})"),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn fill_and_border_share_rgb() {
        let mut rng = StdRng::seed_from_u64(7);
        let color = random_color(&mut rng);
        assert!(color.fill.starts_with("rgba("));
        assert!(color.fill.ends_with(", 0.7)"));
        assert!(color.border.ends_with(", 1)"));
        assert_eq!(
            color.fill.trim_end_matches(", 0.7)"),
            color.border.trim_end_matches(", 1)")
        );
    }
}
