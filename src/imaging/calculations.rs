//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale factor that fits `source` inside `bounds` without enlarging.
///
/// The smaller of the two axis ratios wins so both dimensions fit; the
/// result is capped at `1.0`.
fn fit_scale(source: (u32, u32), bounds: (u32, u32)) -> f64 {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    let scale_w = max_w as f64 / src_w as f64;
    let scale_h = max_h as f64 / src_h as f64;

    scale_w.min(scale_h).min(1.0)
}

/// Calculate output dimensions for a "fit inside" resize.
///
/// The result preserves the source aspect ratio, never exceeds `bounds` on
/// either axis, and never upscales. For sources larger than the bounds, the
/// limiting axis lands exactly on its bound. Each dimension is at least 1px.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bounds` - Maximum output dimensions (width, height)
///
/// # Examples
/// ```
/// # use image_edge::imaging::calculate_fit_inside;
/// // 800x400 into 200x100 → exact fit
/// assert_eq!(calculate_fit_inside((800, 400), (200, 100)), (200, 100));
///
/// // Smaller than bounds → unchanged
/// assert_eq!(calculate_fit_inside((640, 480), (1280, 720)), (640, 480));
/// ```
pub fn calculate_fit_inside(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return source;
    }

    let scale = fit_scale(source, bounds);
    if scale >= 1.0 {
        return source;
    }

    let w = (src_w as f64 * scale).round() as u32;
    let h = (src_h as f64 * scale).round() as u32;
    (w.clamp(1, bounds.0.max(1)), h.clamp(1, bounds.1.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // fit_scale tests
    // =========================================================================

    #[test]
    fn scale_landscape_into_square() {
        // Height-limited would be 0.8, width-limited 0.4 → 0.4
        assert_eq!(fit_scale((1000, 500), (400, 400)), 0.4);
    }

    #[test]
    fn scale_portrait_into_square() {
        assert_eq!(fit_scale((500, 1000), (400, 400)), 0.4);
    }

    #[test]
    fn scale_never_exceeds_one() {
        assert_eq!(fit_scale((100, 100), (200, 200)), 1.0);
    }

    // =========================================================================
    // calculate_fit_inside tests
    // =========================================================================

    #[test]
    fn fit_exact_aspect_match() {
        assert_eq!(calculate_fit_inside((800, 400), (200, 100)), (200, 100));
    }

    #[test]
    fn fit_width_limited() {
        // 1920x1080 into 300x720: width is the binding axis
        assert_eq!(calculate_fit_inside((1920, 1080), (300, 720)), (300, 169));
    }

    #[test]
    fn fit_height_limited() {
        // 1920x1080 into 1280x100: height is the binding axis
        assert_eq!(calculate_fit_inside((1920, 1080), (1280, 100)), (178, 100));
    }

    #[test]
    fn fit_default_bounds() {
        assert_eq!(calculate_fit_inside((4000, 3000), (1280, 720)), (960, 720));
    }

    #[test]
    fn fit_does_not_upscale() {
        assert_eq!(calculate_fit_inside((640, 480), (1280, 720)), (640, 480));
        assert_eq!(calculate_fit_inside((10, 10), (10, 10)), (10, 10));
    }

    #[test]
    fn fit_upscale_guard_applies_per_image_not_per_axis() {
        // Wide enough to need shrinking on width only; height stays proportional
        assert_eq!(calculate_fit_inside((2000, 100), (1000, 720)), (1000, 50));
    }

    #[test]
    fn fit_minimum_one_pixel() {
        assert_eq!(calculate_fit_inside((10000, 10), (100, 100)), (100, 1));
    }

    #[test]
    fn fit_stays_within_bounds_and_touches_one() {
        let cases = [
            ((3001, 1999), (640, 480)),
            ((1999, 3001), (640, 480)),
            ((1234, 567), (89, 1000)),
            ((7, 5000), (300, 300)),
        ];
        for (source, bounds) in cases {
            let (w, h) = calculate_fit_inside(source, bounds);
            assert!(w <= bounds.0 && h <= bounds.1, "{source:?} into {bounds:?} gave {w}x{h}");
            assert!(w == bounds.0 || h == bounds.1, "{source:?} into {bounds:?} gave {w}x{h}");
        }
    }

    #[test]
    fn fit_degenerate_source_is_returned() {
        assert_eq!(calculate_fit_inside((0, 100), (50, 50)), (0, 100));
    }
}
