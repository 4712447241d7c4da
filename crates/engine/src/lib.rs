pub mod claim;
pub mod dispatch;
pub mod recovery;
pub mod runner;
pub mod transition;
