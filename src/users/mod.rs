pub mod repo_types;
pub mod store;

pub use store::UserStore;
