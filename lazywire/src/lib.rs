//! # lazywire: lazy dependency injection for Rust
//!
//! Declare how each type is provided, let the container validate the whole
//! graph once, then build only what is asked for.
//!
//! ```rust
//! use lazywire::prelude::*;
//! use lazywire::Inject;
//! use std::sync::Arc;
//!
//! #[derive(Clone)]
//! struct Config { dsn: String }
//!
//! struct Database { dsn: String }
//!
//! #[derive(Default, Inject)]
//! struct App {
//!     pub db: Option<Arc<Database>>,
//!     #[inject(skip)]
//!     pub name: String,
//! }
//!
//! let container = Container::new();
//! container.provide([
//!     value(Config { dsn: "postgres://localhost".into() }),
//!     func(|cfg: Config| Some(Arc::new(Database { dsn: cfg.dsn }))),
//! ]);
//! container.resolve()?;
//!
//! let mut app = App::default();
//! container.inject(&mut app)?;
//! assert_eq!(app.db.unwrap().dsn, "postgres://localhost");
//!
//! container.clean();
//! # Ok::<(), lazywire::InjectorError>(())
//! ```

pub use lazywire_container::*;
pub use lazywire_macros::*;
pub use lazywire_support::*;
