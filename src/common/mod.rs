/*
 * Structures shared across the crate
 *   FloatBox: axis-aligned query window in world coordinates
 */

#[derive(Clone, Debug, PartialEq)]
pub struct FloatBox {
  pub x_min: f64,
  pub x_max: f64,
  pub y_min: f64,
  pub y_max: f64,
}

impl FloatBox {
  pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> FloatBox {
    FloatBox { x_min, x_max, y_min, y_max }
  }

  pub fn around_circle(center: (f64, f64), radius: f64) -> FloatBox {
    FloatBox {
      x_min: center.0 - radius,
      x_max: center.0 + radius,
      y_min: center.1 - radius,
      y_max: center.1 + radius,
    }
  }

  pub fn around_vertices(vertices: &[(f64, f64)]) -> FloatBox {
    assert!(!vertices.is_empty(), "vertex list must not be empty");
    let mut bound = FloatBox::new(vertices[0].0, vertices[0].0, vertices[0].1, vertices[0].1);
    for (x, y) in &vertices[1..] {
      bound.x_min = bound.x_min.min(*x);
      bound.x_max = bound.x_max.max(*x);
      bound.y_min = bound.y_min.min(*y);
      bound.y_max = bound.y_max.max(*y);
    }
    bound
  }
}

pub mod error;


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn circle_window_test() {
    let window = FloatBox::around_circle((0.5, 0.5), 0.25);
    assert_eq!(window, FloatBox::new(0.25, 0.75, 0.25, 0.75));
  }

  #[test]
  fn vertices_window_test() {
    let window = FloatBox::around_vertices(&[(1.0, 5.0), (-2.0, 3.0), (4.0, -1.0)]);
    assert_eq!(window, FloatBox::new(-2.0, 4.0, -1.0, 5.0));
  }
}
