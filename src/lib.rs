#[macro_use]
extern crate tracing;

pub mod error;
pub mod exposition;
mod logging;
pub mod router;
mod server;

pub use logging::init_logging;
pub use server::run;
