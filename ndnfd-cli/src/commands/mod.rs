pub mod benchmark;
pub mod cs;
pub mod face;
pub mod fib;
pub mod interest;
pub mod publish;
pub mod strategy;
