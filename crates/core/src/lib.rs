pub mod classify;
pub mod stream;
pub mod trace;

pub use trace::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
