//! Data store modules for PostgreSQL persistence

pub mod items;
pub mod postgres;
pub mod users;

pub use items::{Item, ItemChanges, ItemStore, NewItem, PgItemStore};
pub use postgres::{connect, StoreError};
pub use users::{NewUser, PgUserStore, User, UserStore};
