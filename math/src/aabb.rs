use cgmath::{BaseNum, Point2};

pub type Aabb2f = Aabb2<f32>;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2<S> {
    pub min: Point2<S>,
    pub max: Point2<S>,
}

impl<S: BaseNum> Aabb2<S> {
    pub fn new(min: Point2<S>, max: Point2<S>) -> Aabb2<S> {
        Aabb2 { min, max }
    }

    pub fn from_point(point: Point2<S>) -> Aabb2<S> {
        Aabb2 {
            min: point,
            max: point,
        }
    }

    pub fn from_points<I>(points: I) -> Option<Aabb2<S>>
    where
        I: IntoIterator<Item = Point2<S>>,
    {
        let mut points = points.into_iter();
        let mut bounds = Aabb2::from_point(points.next()?);
        for point in points {
            bounds.extend(point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: Point2<S>) {
        if point.x < self.min.x {
            self.min.x = point.x;
        }
        if point.y < self.min.y {
            self.min.y = point.y;
        }
        if point.x > self.max.x {
            self.max.x = point.x;
        }
        if point.y > self.max.y {
            self.max.y = point.y;
        }
    }

    pub fn width(&self) -> S {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> S {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> S {
        self.width() * self.height()
    }

    pub fn contains_point(&self, point: Point2<S>) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y
            && point.y <= self.max.y
    }

    pub fn contains(&self, other: &Aabb2<S>) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }
}

#[cfg(test)]
mod test {
    use super::Aabb2f;
    use cgmath::Point2;

    #[test]
    fn test_extend_and_area() {
        let points = vec![
            Point2::new(1.0, 2.0),
            Point2::new(-3.0, 4.0),
            Point2::new(0.0, -1.0),
        ];
        let bounds = Aabb2f::from_points(points).expect("non-empty points");
        assert_eq!(bounds.min, Point2::new(-3.0, -1.0));
        assert_eq!(bounds.max, Point2::new(1.0, 4.0));
        assert_eq!(bounds.area(), 20.0);
        assert!(Aabb2f::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_contains() {
        let outer = Aabb2f::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        let inner = Aabb2f::new(Point2::new(2.0, 2.0), Point2::new(4.0, 4.0));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains_point(Point2::new(10.0, 0.0)));
    }
}
