pub mod alpaca;
pub mod clock;
pub mod config;
pub mod error;
pub mod execution;
pub mod model;
pub mod pipeline;
pub mod price;
pub mod sentiment;
pub mod sizing;
pub mod yahoo;
