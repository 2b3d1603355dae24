pub mod enums;
pub mod profile;

pub use enums::*;
pub use profile::*;
