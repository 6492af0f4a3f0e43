// Our Real scalar type, used at the public boundary only. Everything inside the
// Boolean pipeline runs on `crate::exact::Exact`.
#[cfg(feature = "f32")]
pub type Real = f32;
#[cfg(feature = "f64")]
pub type Real = f64;
