pub mod ledger;
pub mod normalizer;
pub mod orchestrator;
pub mod relocator;
pub mod resolver;
pub mod sanitizer;
pub mod scheduler;
