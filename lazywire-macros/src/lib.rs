//! Derive macros for lazywire.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod inject;

/// Implements `Inject` for a struct with named fields.
///
/// Every non-private field is resolved from the container in declaration
/// order. Private fields and fields marked `#[inject(skip)]` are left as
/// they are.
///
/// # Examples
///
/// ```ignore
/// #[derive(Default, Inject)]
/// pub struct Handlers {
///     pub users: Option<Arc<UserService>>,
///     pub config: Config,
///     #[inject(skip)]
///     pub requests: u64,
///     cache: Vec<String>,
/// }
///
/// let mut handlers = Handlers::default();
/// container.inject(&mut handlers)?;
/// ```
///
/// Use `#[inject(crate = "path")]` when `lazywire` is re-exported under
/// another name.
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match inject::expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.write_errors().into(),
    }
}
