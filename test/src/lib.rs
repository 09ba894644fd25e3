pub mod test_game;

pub use helpers::*;
pub use local_transport::{ClientId, LocalHub};
pub use test_game::{Phase, TestGame};
