pub mod dataset;
pub mod experiment;
pub mod job;
pub mod login;
pub mod manifest;
pub mod print_config;
pub mod run;
