//! SQLite storage implementation for flyers.

mod model;
mod repository;

pub use model::{FlyerChangesetDB, FlyerDB, NewFlyerDB};
pub use repository::FlyerRepository;
