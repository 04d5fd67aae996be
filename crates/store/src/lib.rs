//! Persistence for the caviar shop.
//!
//! The workflow layer talks to storage only through the traits in [`store`].
//! Two backends implement them: [`memory`] for tests and local runs, and
//! [`postgres`] for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryCatalogStore, InMemoryOrderStore, InMemoryUserStore};
pub use postgres::PostgresStore;
pub use query::{OrderFilter, OrderStatistics, Pagination, ProductFilter, ProductSort, SortOrder};
pub use store::{CatalogStore, OrderStore, UserStore};
