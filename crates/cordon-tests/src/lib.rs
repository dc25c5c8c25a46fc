//! Integration tests across the blocking pipeline: orchestration, storage
//! enforcement and routing enforcement sharing one registry.

#[cfg(test)]
mod end_to_end;
