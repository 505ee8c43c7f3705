//! Thread-shared ownership of the landmark graph.

pub mod shared_state;

pub use shared_state::SharedState;
