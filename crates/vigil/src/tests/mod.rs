//! Test suites for the lifecycle manager.

mod support;
mod unit;
