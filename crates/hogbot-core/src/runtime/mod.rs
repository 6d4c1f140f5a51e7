//! Event dispatch runtime.

mod handler;

pub use handler::{DispatchOutcome, EventDispatcher};
