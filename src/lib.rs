pub mod archive;
pub mod assemble;
pub mod catalog;
pub mod classify;
pub mod columnar;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod output;
pub mod period;
pub mod pipeline;
