pub mod health;
pub mod predict;
pub mod student;
