//! Integration tests for filetick acceptance testing.
//!
//! Live-clock tests run on whatever clock the host provides; simulated
//! tests replay fixed reading sequences through [`common::ReplayClock`].

mod concurrency_test;
mod config_test;
mod monotonic_test;
