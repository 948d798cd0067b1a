pub mod state;
pub mod store;

pub use state::{Action, AppState, Banner, BannerLevel, Effect};
pub use store::{IdGenerator, RecordStore};
