pub mod analyzers;
pub mod chart;
pub mod cleaning;
pub mod error;
pub mod loader;
pub mod output;
pub mod quality;
pub mod table;
