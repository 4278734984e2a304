//! Macros for the pairsync coordinator.
//!
//! This crate is intended for inner use only by the coordinator binary.

#![forbid(non_ascii_idents, unsafe_code)]

mod dispatchable;

use proc_macro::TokenStream;

/// Generates a `*Handler` trait and a `dispatch_with()` method for an event
/// enum.
///
/// For an enum `Foo`, generates trait `FooHandler` with one `on_<variant>`
/// method per variant (`camelCase`/`PascalCase` variant names are converted
/// to `snake_case`), and an inherent `Foo::dispatch_with(&mut self, handler)`
/// that matches on `self` and calls the matching handler method.
///
/// ```ignore
/// #[dispatchable]
/// enum ClientEvent {
///     Join { room: String },
///     Leave,
/// }
///
/// impl ClientEventHandler for Dispatcher {
///     fn on_join(&mut self, room: String) { /* ... */ }
///     fn on_leave(&mut self) { /* ... */ }
/// }
/// ```
#[proc_macro_attribute]
pub fn dispatchable(_args: TokenStream, input: TokenStream) -> TokenStream {
    dispatchable::derive(input)
        .unwrap_or_else(|e| e.to_compile_error().into())
}
