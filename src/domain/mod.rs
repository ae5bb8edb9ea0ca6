mod analysis;
mod controller;
mod entries;
mod selection;
mod suggestions;
mod types;

pub use analysis::*;
pub use controller::*;
pub use entries::*;
pub use selection::*;
pub use suggestions::*;
pub use types::*;
