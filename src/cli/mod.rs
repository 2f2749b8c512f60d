pub mod orchestration;

pub use orchestration::{CommitsArgs, RunArgs};
