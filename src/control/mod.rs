//! Induction cooker control: line protocol, feedback capture and the
//! power-level state machine.

pub mod feedback;
pub mod induction;
pub mod protocol;
