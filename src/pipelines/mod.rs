pub mod index;
pub mod methylation;
pub mod stages;
