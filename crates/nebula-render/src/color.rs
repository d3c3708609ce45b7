/// Convert HSV to linear RGB.
///
/// `hue` is in degrees and wraps; `saturation` and `value` are clamped to `[0, 1]`.
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let s = saturation.clamp(0.0, 1.0);
    let v = value.clamp(0.0, 1.0);
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = v * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn test_primary_hues() {
        assert!(close(hsv_to_rgb(0.0, 1.0, 1.0), [1.0, 0.0, 0.0]));
        assert!(close(hsv_to_rgb(120.0, 1.0, 1.0), [0.0, 1.0, 0.0]));
        assert!(close(hsv_to_rgb(240.0, 1.0, 1.0), [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_hue_wraps() {
        assert!(close(hsv_to_rgb(360.0, 1.0, 1.0), hsv_to_rgb(0.0, 1.0, 1.0)));
        assert!(close(hsv_to_rgb(-120.0, 1.0, 1.0), hsv_to_rgb(240.0, 1.0, 1.0)));
    }

    #[test]
    fn test_zero_saturation_is_grey() {
        assert!(close(hsv_to_rgb(200.0, 0.0, 0.5), [0.5, 0.5, 0.5]));
    }

    #[test]
    fn test_partial_saturation() {
        // hue 0, s 0.7, v 1: red channel full, others at 0.3
        assert!(close(hsv_to_rgb(0.0, 0.7, 1.0), [1.0, 0.3, 0.3]));
    }
}
