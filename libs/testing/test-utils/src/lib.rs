//! Shared test infrastructure
//!
//! `TestDatabase` starts a throwaway PostgreSQL container with every
//! migration applied; `TestQdrant` starts an empty Qdrant. Tests using
//! either need a Docker daemon.
//!
//! ```rust,no_run
//! use test_utils::TestDatabase;
//! # struct MyRepository;
//! # impl MyRepository { fn new<C>(_: C) -> Self { Self } }
//!
//! # async fn example() {
//! let db = TestDatabase::new().await;
//! let repo = MyRepository::new(db.connection.clone());
//! # }
//! ```

mod postgres;
mod qdrant;

pub use postgres::TestDatabase;
pub use qdrant::TestQdrant;
