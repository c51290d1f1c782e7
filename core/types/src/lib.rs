mod credential;
mod dataset;
mod error;
mod experiment;
mod job;
mod manifest;

pub use credential::*;
pub use dataset::*;
pub use error::*;
pub use experiment::*;
pub use job::*;
pub use manifest::*;
