pub mod advisory;
pub mod coaching;
pub mod contract;
pub mod goal;
pub mod resort;
pub mod weather;
