//! Procedural macros for the Relay actor runtime.
//!
//! This crate provides:
//!
//! - `#[derive(Transportable)]` - Admits a user type into messages
//!
//! The derive is re-exported by `relay-core` and by the `relay` facade, so
//! depending on this crate directly is never necessary.

mod transportable;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `Transportable` for structs and enums.
///
/// The reported type kind depends on the shape of the type:
///
/// | Shape | Kind | Extra requirement |
/// |-------|------|-------------------|
/// | Struct without fields | `Empty` | none |
/// | Enum whose variants are all unit | `Enum` | none |
/// | Anything else | `Inspectable` | `serde::Serialize + serde::de::DeserializeOwned` |
///
/// Type parameters receive a `Transportable` bound. Unions are rejected.
///
/// # Attributes
///
/// - `#[transportable(crate = "...")]` - Path to `relay_core` when it is
///   reached through a re-export (for example `relay::core`)
///
/// # Example
///
/// ```rust,ignore
/// use relay_core::Transportable;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, Serialize, Deserialize, Transportable)]
/// pub struct Transfer {
///     pub from: String,
///     pub to: String,
///     pub amount: u64,
/// }
///
/// #[derive(Clone, Debug, Transportable)]
/// pub enum Command {
///     Start,
///     Stop,
/// }
/// ```
#[proc_macro_derive(Transportable, attributes(transportable))]
pub fn derive_transportable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match transportable::derive_transportable(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
