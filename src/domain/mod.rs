mod error;
mod film;
mod money;
mod pricing;
mod rental;

pub use error::*;
pub use film::*;
pub use money::*;
pub use pricing::*;
pub use rental::*;
