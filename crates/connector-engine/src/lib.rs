pub mod machine;

pub use machine::{Engine, EntryEvent};
