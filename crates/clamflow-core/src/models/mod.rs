pub mod event;

pub use event::{EventDecodeError, ObjectCreatedEvent};
