pub mod atoms;
pub mod errors;
pub mod fixed_point;
pub mod identifiers;

pub use atoms::{Atoms, AtomsDelta};
pub use errors::{FixedPointError, ValidationError};
pub use fixed_point::Q64_64;
pub use identifiers::{Pubkey, Signature};
