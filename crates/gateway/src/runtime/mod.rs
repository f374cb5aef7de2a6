pub mod prompts;
pub mod session_lock;
pub mod turn;

pub use turn::{run_turn, TurnInput, TurnOutcome, TurnState};
