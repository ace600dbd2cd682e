pub mod cargo;
pub mod npc;
pub mod player;
pub mod projectile;

pub use cargo::CargoBox;
pub use npc::{Behavior, Npc};
pub use player::Player;
pub use projectile::{Projectile, ProjectileOwner, TargetRef};
