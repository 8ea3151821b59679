pub mod accumulator_math;
pub mod burn;
pub mod circuit_breaker;
pub mod collect;
pub mod deposit;
pub mod lock;
pub mod mint;
pub mod ownership;
pub mod skim_excess;

pub use accumulator_math::Collection;
