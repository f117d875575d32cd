#![forbid(unsafe_code)]
#![doc = "A finite multiplayer game of imperfect information: states, players, joint actions, per-player indistinguishability, and a text-format reader."]

mod game;
pub mod io;

pub use game::DistributedGame;
pub use game::GameAccessError;
pub use game::GameConstructionError;
pub use game::JointAction;
pub use game::PlayerIndex;
pub use game::PlayerTag;
pub use game::StateIndex;
pub use game::StateTag;
