use crate::common::error::GResult;
use crate::common::error::InvalidJobError;
use crate::common::error::NegativeQuantizedCoordinate;
use crate::common::FloatBox;
use crate::sfc::QuantizedBox;


/* Scale/offset quantization between world and curve coordinates */

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantizedPoint {
  pub x: i64,
  pub y: i64,
  pub z: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Quantizer {
  scales: [f64; 3],
  offsets: [f64; 3],
}

impl Quantizer {
  pub fn new(scales: [f64; 3], offsets: [f64; 3]) -> GResult<Quantizer> {
    if scales.iter().any(|scale| *scale == 0.0) {
      return Err(InvalidJobError::boxed("scales must be non-zero"));
    }
    Ok(Quantizer { scales, offsets })
  }

  pub fn quantize(&self, x: f64, y: f64, z: f64) -> GResult<QuantizedPoint> {
    let qx = ((x - self.offsets[0]) / self.scales[0]).round() as i64;
    let qy = ((y - self.offsets[1]) / self.scales[1]).round() as i64;
    if qx < 0 {
      return Err(NegativeQuantizedCoordinate::boxed("x", qx));
    }
    if qy < 0 {
      return Err(NegativeQuantizedCoordinate::boxed("y", qy));
    }
    Ok(QuantizedPoint { x: qx, y: qy, z: round2(z) })
  }

  pub fn dequantize(&self, x: i64, y: i64) -> (f64, f64) {
    (
      x as f64 * self.scales[0] + self.offsets[0],
      y as f64 * self.scales[1] + self.offsets[1],
    )
  }

  // Outward rounding: floor on mins, ceil on maxes, so no point that
  // quantizes onto the window boundary is lost.
  pub fn curve_box(&self, window: &FloatBox) -> QuantizedBox {
    QuantizedBox::new(
      ((window.x_min - self.offsets[0]) / self.scales[0]).floor() as i64,
      ((window.x_max - self.offsets[0]) / self.scales[0]).ceil() as i64,
      ((window.y_min - self.offsets[1]) / self.scales[1]).floor() as i64,
      ((window.y_max - self.offsets[1]) / self.scales[1]).ceil() as i64,
    )
  }
}

pub fn round2(z: f64) -> f64 {
  (z * 100.0).round() / 100.0
}
