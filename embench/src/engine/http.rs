pub use self::{cfg::Config, engine::Engine, target::Target};

mod cfg;
mod engine;
pub(crate) mod io;
pub mod payload;
mod target;
