//! Vector helpers on 3D positions

use nalgebra::Vector3;

/// A position or direction in embryo space
pub type Vec3 = Vector3<f64>;

/// `a - b`
pub fn subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    a - b
}

/// Scalar product
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a.dot(b)
}

/// Linear interpolation: `weight = 0` gives `a`, `weight = 1` gives `b`
pub fn interpolate(a: &Vec3, b: &Vec3, weight: f64) -> Vec3 {
    a * (1.0 - weight) + b * weight
}

/// Mean of a set of points, `None` when empty
pub fn average<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Vec3> {
    let mut sum = Vec3::zeros();
    let mut count = 0usize;
    for p in points {
        sum += p;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtract_and_dot() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(0.5, 0.0, -1.0);
        assert_eq!(subtract(&a, &b), Vec3::new(0.5, 2.0, 4.0));
        assert_eq!(dot(&a, &b), 0.5 - 3.0);
    }

    #[test]
    fn test_interpolate_endpoints() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(4.0, -2.0, 8.0);
        assert_eq!(interpolate(&a, &b, 0.0), a);
        assert_eq!(interpolate(&a, &b, 1.0), b);
        assert_eq!(interpolate(&a, &b, 0.25), Vec3::new(1.0, -0.5, 2.0));
    }

    #[test]
    fn test_average() {
        let points = [Vec3::new(1.0, 0.0, 0.0), Vec3::new(3.0, 2.0, 0.0)];
        assert_eq!(average(points.iter()), Some(Vec3::new(2.0, 1.0, 0.0)));
        assert_eq!(average(std::iter::empty()), None);
    }
}
