pub mod enrollment;
pub mod exit;
pub mod profits;
