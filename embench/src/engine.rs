pub use self::{
    http::{Config, Engine, Target},
    state::{Phase, Stop},
};

pub mod http;
mod runtime;
mod state;
