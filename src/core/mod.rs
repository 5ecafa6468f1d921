pub mod distribute;
pub mod finance;
pub mod planning;
