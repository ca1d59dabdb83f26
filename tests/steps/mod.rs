// Step definitions, organized by feature area.

pub mod mining;
pub mod node;
pub mod wallet;
