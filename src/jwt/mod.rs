mod claims;
mod issuer;
mod signing;

pub use claims::*;
pub use issuer::TokenIssuer;
pub use signing::*;
