//! Workflow tests

mod end_to_end;
mod recursive;
mod safety;
