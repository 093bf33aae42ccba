/// Maps any finite angle in degrees into `[0, 360)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let out = deg.rem_euclid(360.);
    /// rem_euclid can round up to exactly 360 for tiny negative inputs
    if out >= 360. {
        0.
    } else {
        out
    }
}

/// Direction from `anchor` to `pointer` in screen coordinates (y grows downward).
///
/// 0° points right, 90° points up. `None` when the pointer sits on the anchor.
pub fn angle_from_pointer(anchor: (f64, f64), pointer: (f64, f64)) -> Option<f64> {
    let dx = pointer.0 - anchor.0;
    let dy = anchor.1 - pointer.1;

    if dx == 0. && dy == 0. {
        return None;
    }

    Some(normalize_degrees(dy.atan2(dx).to_degrees()))
}

/// Inverse of [`angle_from_pointer`]: the point `length` away from `anchor` along `angle`.
pub fn line_endpoint(anchor: (f64, f64), angle: f64, length: f64) -> (f64, f64) {
    let rad = angle.to_radians();
    (anchor.0 + length * rad.cos(), anchor.1 - length * rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn cardinal_directions() {
        let c = (200., 100.);
        assert!(close(angle_from_pointer(c, (300., 100.)).unwrap(), 0.));
        assert!(close(angle_from_pointer(c, (200., 0.)).unwrap(), 90.));
        assert!(close(angle_from_pointer(c, (100., 100.)).unwrap(), 180.));
        assert!(close(angle_from_pointer(c, (200., 150.)).unwrap(), 270.));
        assert!(close(angle_from_pointer(c, (250., 50.)).unwrap(), 45.));
    }

    #[test]
    fn pointer_on_anchor_is_undefined() {
        assert_eq!(angle_from_pointer((5., 5.), (5., 5.)), None);
    }

    #[test]
    fn always_in_range() {
        let c = (0., 0.);
        for i in 0..720 {
            let t = (i as f64 * 0.5).to_radians();
            for r in [0.001, 1., 37.5, 1e6] {
                let p = (r * t.cos(), -r * t.sin());
                let a = angle_from_pointer(c, p).unwrap();
                assert!((0. ..360.).contains(&a), "angle {} out of range", a);
            }
        }
    }

    #[test]
    fn continuous_away_from_wrap() {
        let c = (0., 0.);
        let mut prev = angle_from_pointer(c, (1., -0.01)).unwrap();
        for i in 1..350 {
            let t = (i as f64 + 0.5).to_radians();
            let a = angle_from_pointer(c, (t.cos(), -t.sin())).unwrap();
            assert!((a - prev).abs() < 1.5, "jump from {} to {}", prev, a);
            prev = a;
        }
    }

    #[test]
    fn wraps_just_below_zero() {
        let a = angle_from_pointer((0., 0.), (10., 0.001)).unwrap();
        assert!(a > 359.9 && a < 360.);
    }

    #[test]
    fn normalize() {
        assert!(close(normalize_degrees(-90.), 270.));
        assert!(close(normalize_degrees(720.), 0.));
        assert!(close(normalize_degrees(361.5), 1.5));
        assert!(normalize_degrees(-1e-20) < 360.);
    }

    #[test]
    fn endpoint_roundtrips_through_angle() {
        let c = (200., 100.);
        for a in [0., 12.5, 90., 179., 233.3, 359.] {
            let p = line_endpoint(c, a, 95.);
            let back = angle_from_pointer(c, p).unwrap();
            assert!((back - a).abs() < 1e-6, "{} != {}", back, a);
        }
    }
}
