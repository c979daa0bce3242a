use crate::identity::{decode_identity, decode_key, encode_identity, Identity, Key, KeyCategory, KeyKind};
use crate::components::{ComponentId, TypeExpression};

#[test]
pub fn identity_bit_layout() {
	let identity = Identity::new(0xDEAD_BEEF, 0x1234);
	assert_eq!(identity.raw(), 0x0000_1234_DEAD_BEEF, "Identity is not packed as index | generation << 32");
	assert_eq!(decode_identity(identity.raw()), (0xDEAD_BEEF, 0x1234));
	assert_eq!(encode_identity(7, 3), Identity::new(7, 3).raw());
	assert_eq!(identity.index(), 0xDEAD_BEEF);
	assert_eq!(identity.generation(), 0x1234);
}

#[test]
pub fn none_is_never_a_live_generation() {
	assert!(Identity::NONE.is_none());
	assert_eq!(Identity::NONE.raw(), 0);
	assert!(!Identity::new(0, 1).is_none());
}

#[test]
pub fn successor_skips_generation_zero() {
	let identity = Identity::new(42, 1);
	assert_eq!(identity.successor(), Identity::new(42, 2));

	let last = Identity::new(42, u16::MAX);
	assert_eq!(last.successor(), Identity::new(42, 1), "Generation wrapped onto zero");
}

#[test]
pub fn key_categories() {
	let target = Identity::new(5, 9);
	let backing = ComponentId::new(3);

	assert_eq!(Key::PLAIN.raw(), 0);
	assert_eq!(Key::PLAIN.category(), KeyCategory::Plain);
	assert_eq!(Key::entity(target).category(), KeyCategory::Entity);
	assert_eq!(Key::link(&"object", backing).category(), KeyCategory::Link);
	assert_eq!(Key::ANY.category(), KeyCategory::Wildcard);

	let (category, payload) = decode_key(Key::entity(target).raw());
	assert_eq!(category, 1);
	assert_eq!(payload, target.raw());

	assert_eq!(Key::entity(target).decode(), KeyKind::Entity(target));
	assert_eq!(Key::entity(target).target(), Some(target));
	assert_eq!(Key::from(target), Key::entity(target));
	assert_eq!(Key::PLAIN.target(), None);

	match Key::link_from_hash(0xCAFE_F00D, backing).decode() {
		KeyKind::Link { hash, backing: id } => {
			assert_eq!(hash, 0xCAFE_F00D);
			assert_eq!(id, backing);
		},
		kind => panic!("Unexpected key kind {kind:?}"),
	}
}

#[test]
pub fn link_keys_are_deterministic() {
	let backing = ComponentId::new(1);
	assert_eq!(Key::link(&"alpha", backing), Key::link(&"alpha", backing));
	assert_ne!(Key::link(&"alpha", backing), Key::link(&"beta", backing));
	assert_ne!(Key::link(&"alpha", backing), Key::link(&"alpha", ComponentId::new(2)));
}

#[test]
pub fn wildcard_matching() {
	let relation = Key::entity(Identity::new(1, 1));
	let link = Key::link_from_hash(17, ComponentId::new(0));
	let candidates = [Key::PLAIN, relation, link];

	let expected = [
		(Key::ANY, [true, true, true]),
		(Key::TARGET, [false, true, true]),
		(Key::ENTITY, [false, true, false]),
		(Key::LINK, [false, false, true]),
		(Key::PLAIN, [true, false, false]),
		(relation, [false, true, false]),
	];

	for (pattern, results) in expected {
		for (candidate, result) in candidates.iter().zip(results) {
			assert_eq!(pattern.matches(*candidate), result, "{pattern} matching {candidate}");
		}
	}
}

#[test]
pub fn matching_is_not_commutative() {
	let relation = Key::entity(Identity::new(1, 1));
	assert!(Key::ANY.matches(relation));
	assert!(!relation.matches(Key::ANY));
}

#[test]
pub fn expression_matching_requires_the_same_type() {
	let target = Identity::new(2, 1);
	let a = ComponentId::new(0);
	let b = ComponentId::new(1);

	let pattern = TypeExpression::new(a, Key::ENTITY);
	assert!(pattern.matches(TypeExpression::relation(a, target)));
	assert!(!pattern.matches(TypeExpression::relation(b, target)));
	assert!(!pattern.matches(TypeExpression::plain(a)));
	assert!(pattern.is_wildcard());
	assert!(TypeExpression::relation(a, target).is_relation());
}

#[test]
pub fn display_formats() {
	assert_eq!(Identity::new(3, 2).to_string(), "E3v2");
	assert_eq!(Key::PLAIN.to_string(), "plain");
	assert_eq!(Key::entity(Identity::new(3, 2)).to_string(), "E3v2");
	assert_eq!(Key::ANY.to_string(), "*any");
	assert_eq!(TypeExpression::plain(ComponentId::new(4)).to_string(), "#4<plain>");
}
