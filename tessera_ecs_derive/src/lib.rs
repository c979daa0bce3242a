mod component;

use proc_macro::TokenStream;

#[proc_macro_derive(Component)]
pub fn derive_component(input: TokenStream) -> TokenStream {
	match syn::parse(input) {
		Ok(ast) => component::impl_component(&ast),
		Err(err) => err.to_compile_error().into(),
	}
}
