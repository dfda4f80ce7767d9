//! Utility macros for reducing boilerplate

/// Implement `FromRef<AppState>` so a state field can be extracted
/// directly in Axum handlers.
///
/// # Example
/// ```ignore
/// impl_from_ref!(SharedStore, store);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for SharedStore {
///     fn from_ref(state: &AppState) -> Self {
///         state.store.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
