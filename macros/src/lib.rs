//! Procedural macros for fannypack


use proc_macro::TokenStream;

/// Attribute macro for test functions that need a store
///
/// Builds the store, passes it to the test body as `store`, then clears and
/// closes it once the body returns. Defaults to a `MemoryStore`.
///
/// # Basic usage
///
/// ```ignore
/// #[fannypack_macros::store_test]
/// async fn my_test() {
///     store.set("a", &json!(1)).await.unwrap();
/// }
/// ```
///
/// # With a custom store
///
/// ```ignore
/// #[fannypack_macros::store_test(store = OrderedStore::new(Arc::new(InMemoryStorage::new())))]
/// async fn my_test() {
///     // test body
/// }
/// ```
#[proc_macro_attribute]
pub fn store_test(args: TokenStream, input: TokenStream) -> TokenStream {
    test::store::test_impl(args.into(), input.into()).into()
}
