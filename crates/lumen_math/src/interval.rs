/// A closed range of ray parameters or coordinates on one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns the size of the interval (max - min).
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    /// True for intervals with `min > max`.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Returns true if x is within the interval [min, max] (inclusive).
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// Returns true if x is strictly within the interval (min, max) (exclusive).
    pub fn surrounds(&self, x: f32) -> bool {
        self.min < x && x < self.max
    }

    /// Expands the interval by delta/2 on each side.
    pub fn expand(&self, delta: f32) -> Interval {
        let padding = delta / 2.0;
        Interval::new(self.min - padding, self.max + padding)
    }

    /// Grow the interval so it includes `x`.
    pub fn include(&self, x: f32) -> Interval {
        Interval::new(self.min.min(x), self.max.max(x))
    }

    /// Creates an interval that surrounds two other intervals.
    pub fn surrounding(a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.min.min(b.min), a.max.max(b.max))
    }

    /// An empty interval (min > max, contains nothing).
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// The interval containing every value.
    pub const UNIVERSE: Interval = Interval {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };
}

impl Default for Interval {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surrounds_is_exclusive() {
        let range = Interval::new(1e-4, 1000.0);
        assert!(range.surrounds(1.0));
        assert!(!range.surrounds(1e-4));
        assert!(!range.surrounds(1000.0));
        assert!(range.contains(1000.0));
    }

    #[test]
    fn test_empty_grows_to_point() {
        let grown = Interval::EMPTY.include(3.0);
        assert!(Interval::EMPTY.is_empty());
        assert_eq!(grown, Interval::new(3.0, 3.0));
        assert_eq!(grown.size(), 0.0);
    }

    #[test]
    fn test_surrounding() {
        let a = Interval::new(-1.0, 2.0);
        let b = Interval::new(0.5, 4.0);
        assert_eq!(Interval::surrounding(&a, &b), Interval::new(-1.0, 4.0));
        assert_eq!(Interval::surrounding(&Interval::EMPTY, &b), b);
    }
}
