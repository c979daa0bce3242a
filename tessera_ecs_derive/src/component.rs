use proc_macro::TokenStream;
use syn::DeriveInput;
use quote::quote;

/// Implements the `Component` marker for the annotated type.
///
/// Component ids are assigned per world on first use,
/// so the derive only opts the type into storage.
pub fn impl_component(ast: &DeriveInput) -> TokenStream {
	let name = &ast.ident;
	let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

	let gen = quote! {
		impl #impl_generics ::tessera_ecs::components::Component for #name #ty_generics #where_clause {}
	};
	gen.into()
}
