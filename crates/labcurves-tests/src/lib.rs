//! Integration test crate for the Lab curves bridge.
//!
//! Runs the curves procedure end to end against `MemoryHost`, with stub
//! tools written as shell scripts standing in for the external binary.

#[cfg(all(test, unix))]
mod fixture;

#[cfg(all(test, unix))]
mod curves;

#[cfg(all(test, unix))]
mod failures;
