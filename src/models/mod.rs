mod contact;
mod license;

pub use contact::*;
pub use license::*;
