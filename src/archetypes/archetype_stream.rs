use crate::components::{Component, TypeExpression, TypeRegistry};
use crate::data_structures::{AnyStorage, Storage};
use crate::archetypes::ArchetypeInstance;
use crate::error::{EcsError, EcsResult};
use std::marker::PhantomData;
use crate::identity::Key;
use paste::paste;

/// A column resolved for one archetype.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Access {
	pub column: usize,
	pub write: bool,
}

/// A single column request of a [Stream].
pub trait Term: Sync {
	type Column<'a>;

	/// The expression this term selects, or `None` if its type was never used by the world.
	fn pattern(&self, types: &TypeRegistry) -> Option<TypeExpression>;

	fn is_write(&self) -> bool;

	/// Finds the first column of `archetype` satisfying the term.
	fn resolve(&self, types: &TypeRegistry, archetype: &ArchetypeInstance) -> Option<Access> {
		let pattern = self.pattern(types)?;
		let column = archetype.signature().first_match(&pattern)?;
		Some(Access {
			column,
			write: self.is_write(),
		})
	}

	/// # Safety
	/// `column` must point to a live [Storage] of the term's element type that no other
	/// reference aliases mutably for `'a`.
	unsafe fn fetch<'a>(column: *mut Box<dyn AnyStorage>) -> Self::Column<'a>;
}

/// Shared access to the column of `T` under a key; wildcard keys pick the first match.
pub struct Read<T> {
	key: Key,
	marker: PhantomData<fn() -> T>,
}

/// Exclusive access to the column of `T` under a key; wildcard keys pick the first match.
pub struct Write<T> {
	key: Key,
	marker: PhantomData<fn() -> T>,
}

macro_rules! impl_term_constructors {
	($($term: ident),*) => {
		$(
			impl<T: Component> $term<T> {
				pub fn plain() -> Self {
					Self::with_key(Key::PLAIN)
				}

				pub fn with_key(key: Key) -> Self {
					Self {
						key,
						marker: PhantomData,
					}
				}

				pub fn key(&self) -> Key {
					self.key
				}
			}

			impl<T: Component> Default for $term<T> {
				fn default() -> Self {
					Self::plain()
				}
			}
		)*
	};
}

impl_term_constructors!(Read, Write);

impl<T: Component> Term for Read<T> {
	type Column<'a> = &'a [T];

	fn pattern(&self, types: &TypeRegistry) -> Option<TypeExpression> {
		Some(TypeExpression::new(types.id_of::<T>()?, self.key))
	}

	fn is_write(&self) -> bool {
		false
	}

	unsafe fn fetch<'a>(column: *mut Box<dyn AnyStorage>) -> Self::Column<'a> {
		let column: &'a dyn AnyStorage = &**column;
		match column.as_any().downcast_ref::<Storage<T>>() {
			Some(storage) => storage.as_slice(),
			None => unreachable!("column resolved for {} holds another type", std::any::type_name::<T>()),
		}
	}
}

impl<T: Component> Term for Write<T> {
	type Column<'a> = &'a mut [T];

	fn pattern(&self, types: &TypeRegistry) -> Option<TypeExpression> {
		Some(TypeExpression::new(types.id_of::<T>()?, self.key))
	}

	fn is_write(&self) -> bool {
		true
	}

	unsafe fn fetch<'a>(column: *mut Box<dyn AnyStorage>) -> Self::Column<'a> {
		let column: &'a mut dyn AnyStorage = &mut **column;
		match column.as_any_mut().downcast_mut::<Storage<T>>() {
			Some(storage) => storage.as_mut_slice(),
			None => unreachable!("column resolved for {} holds another type", std::any::type_name::<T>()),
		}
	}
}

/// An ordered tuple of [terms](Term), resolved to column slices for every matching archetype.
pub trait Stream: Sync {
	type Columns<'a>;

	/// Resolves every term, or `None` if one of them has no column in `archetype`.
	fn resolve(&self, types: &TypeRegistry, archetype: &ArchetypeInstance) -> Option<Vec<Access>>;

	/// # Safety
	/// `columns` must point to the column array the accesses were resolved against, and the
	/// accesses must have passed [check_aliasing].
	unsafe fn fetch<'a>(columns: *mut Box<dyn AnyStorage>, access: &[Access]) -> Self::Columns<'a>;
}

/// Rejects access lists where a written column is requested more than once.
pub fn check_aliasing(archetype: &ArchetypeInstance, access: &[Access]) -> EcsResult<()> {
	for (i, a) in access.iter().enumerate() {
		for b in &access[i + 1..] {
			if a.column == b.column && (a.write || b.write) {
				return Err(EcsError::AliasedColumn(archetype.signature()[a.column]));
			}
		}
	}
	Ok(())
}

macro_rules! impl_stream {
	($($t: ident $i: tt),*) => {
		paste! {
			impl<$($t: Term),*> Stream for ($($t,)*) {
				type Columns<'a> = ($($t::Column<'a>,)*);

				fn resolve(&self, types: &TypeRegistry, archetype: &ArchetypeInstance) -> Option<Vec<Access>> {
					let ($([<$t:lower>],)*) = self;
					Some(vec![$([<$t:lower>].resolve(types, archetype)?),*])
				}

				unsafe fn fetch<'a>(columns: *mut Box<dyn AnyStorage>, access: &[Access]) -> Self::Columns<'a> {
					($($t::fetch(columns.add(access[$i].column)),)*)
				}
			}
		}
	};
}

impl_stream!(T0 0);
impl_stream!(T0 0, T1 1);
impl_stream!(T0 0, T1 1, T2 2);
impl_stream!(T0 0, T1 1, T2 2, T3 3);
impl_stream!(T0 0, T1 1, T2 2, T3 3, T4 4);
impl_stream!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);
impl_stream!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6);
impl_stream!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7);
