mod blast;
mod boulder;
mod chunk;
mod config;
mod drilling;
mod elevator;
mod events;
mod noise;
mod persist;
mod rover;
mod scheduler;
mod sim;
mod storage;
mod terrain;
mod tile;
mod visibility;
mod world;

pub use blast::*;
pub use boulder::*;
pub use chunk::*;
pub use config::*;
pub use drilling::*;
pub use elevator::*;
pub use events::*;
pub use self::noise::*;
pub use persist::*;
pub use rover::*;
pub use scheduler::*;
pub use sim::*;
pub use storage::*;
pub use terrain::*;
pub use tile::*;
pub use visibility::*;
pub use world::*;
