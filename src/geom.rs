pub mod point;
pub mod vector;
pub mod wireframe;

/// Geometric precision
const EPS: f64 = 1e-13;
