// Workspace integration tests for the perch server family.

pub mod support;

#[cfg(test)]
mod server_tests;
