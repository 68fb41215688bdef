mod aabb;
mod line;

pub use cgmath::prelude;
pub use cgmath::{vec2, vec3, Point2, Point3, Vector2, Vector3};

pub use self::aabb::{Aabb2, Aabb2f};
pub use self::line::{Line2, Line2f};

pub type Pnt2f = Point2<f32>;
pub type Pnt3f = Point3<f32>;
pub type Vec2f = Vector2<f32>;
pub type Vec3f = Vector3<f32>;
pub type Vec2<T> = Vector2<T>;
