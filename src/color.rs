use palette::{IntoColor, Lab, Mix, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Diverging colour map
// ---------------------------------------------------------------------------

/// Blue → light grey → red, interpolated in Lab space.
#[derive(Debug, Clone)]
pub struct DivergingMap {
    low: Lab,
    mid: Lab,
    high: Lab,
    min: f64,
    max: f64,
}

impl DivergingMap {
    /// Coolwarm-style map spanning `[min, max]`.
    pub fn coolwarm(min: f64, max: f64) -> Self {
        DivergingMap {
            low: to_lab(59, 76, 192),
            mid: to_lab(221, 221, 221),
            high: to_lab(180, 4, 38),
            min,
            max,
        }
    }

    /// Colour for `value`; out-of-range values clamp, NaN maps to the midpoint.
    pub fn color_for(&self, value: f64) -> RGBColor {
        let t = if value.is_nan() || self.max <= self.min {
            0.5
        } else {
            ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        };
        let lab = if t < 0.5 {
            self.low.mix(self.mid, (t * 2.0) as f32)
        } else {
            self.mid.mix(self.high, ((t - 0.5) * 2.0) as f32)
        };
        let rgb: Srgb = lab.into_color();
        let rgb: Srgb<u8> = rgb.into_format();
        RGBColor(rgb.red, rgb.green, rgb.blue)
    }

    /// Dark text on light cells, white text on saturated ones.
    pub fn text_color_for(&self, value: f64) -> RGBColor {
        let RGBColor(r, g, b) = self.color_for(value);
        let luminance = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
        if luminance > 140.0 {
            RGBColor(20, 20, 20)
        } else {
            RGBColor(255, 255, 255)
        }
    }
}

fn to_lab(r: u8, g: u8, b: u8) -> Lab {
    Srgb::new(r, g, b).into_format::<f32>().into_color()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: RGBColor, b: (u8, u8, u8)) -> bool {
        let d = |x: u8, y: u8| (x as i16 - y as i16).abs() <= 2;
        d(a.0, b.0) && d(a.1, b.1) && d(a.2, b.2)
    }

    #[test]
    fn test_endpoints_and_midpoint() {
        let map = DivergingMap::coolwarm(-1.0, 1.0);
        assert!(close(map.color_for(-1.0), (59, 76, 192)));
        assert!(close(map.color_for(0.0), (221, 221, 221)));
        assert!(close(map.color_for(1.0), (180, 4, 38)));
    }

    #[test]
    fn test_clamps_and_nan() {
        let map = DivergingMap::coolwarm(-1.0, 1.0);
        assert_eq!(map.color_for(5.0), map.color_for(1.0));
        assert_eq!(map.color_for(f64::NAN), map.color_for(0.0));
    }

    #[test]
    fn test_text_contrast() {
        let map = DivergingMap::coolwarm(-1.0, 1.0);
        assert_eq!(map.text_color_for(0.0), RGBColor(20, 20, 20));
        assert_eq!(map.text_color_for(-1.0), RGBColor(255, 255, 255));
    }
}
