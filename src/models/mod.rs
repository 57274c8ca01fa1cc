mod cache;
mod device;
mod principal;
mod token;

pub use cache::*;
pub use device::*;
pub use principal::*;
pub use token::*;
