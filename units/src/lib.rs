pub mod todo;

pub use uom;
pub use uom::si::f32::{Angle, Length, Ratio};

mod units {
  pub use uom::si::{length::{millimeter, centimeter},
                    ratio ::ratio,
                    angle ::{radian, revolution},
  };
}

// Making values from float literals is very long-winded in uom, so provide
// some pithily-named convenience constructors.

/// Generate a function called NAME which returns QUANTITY by interpreting its
/// argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident ) => {
    pub fn $name(x: f32) -> $quantity { $quantity::new::<units::$unit>(x) }
  };
}

wrap!(mm     Length millimeter);
wrap!(cm     Length centimeter);
wrap!(ratio  Ratio       ratio);
wrap!(radian Angle      radian);
wrap!(turn   Angle  revolution);

// Reverse direction of the above
pub fn mm_    (x: Length) -> f32 { x.get::<units::millimeter>() }
pub fn ratio_ (x: Ratio ) -> f32 { x.get::<units::ratio>() }
pub fn radian_(x: Angle ) -> f32 { x.get::<units::radian>() }

#[macro_export]
macro_rules! assert_uom_eq {
  ($unit:ident, $lhs:expr, $rhs:expr, $algo:ident <= $tol:expr) => {
    float_eq::assert_float_eq!($lhs.get::<$unit>(), $rhs.get::<$unit>(), $algo <= $tol)
  };
}
