pub mod deadline;

pub use deadline::{bounded, DeadlineExceeded};
