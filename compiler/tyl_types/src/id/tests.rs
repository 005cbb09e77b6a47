use super::*;

#[test]
fn sentinel_ids_are_fixed() {
    assert_eq!(TypeId::NEVER.raw(), 0);
    assert_eq!(TypeId::ANY.raw(), 1);
}

#[test]
fn builtin_ids_match_runtime_numbering() {
    assert_eq!(TypeId::NONE.raw(), 2);
    assert_eq!(TypeId::BOOL.raw(), 3);
    assert_eq!(TypeId::INT.raw(), 4);
    assert_eq!(TypeId::FLOAT.raw(), 5);
    assert_eq!(TypeId::STR.raw(), 6);
    assert_eq!(TypeId::OBJECT.raw(), 7);
    assert!(TypeId::OBJECT.is_builtin());
    assert!(!TypeId::from_raw(TypeId::FIRST_DYNAMIC).is_builtin());
}

#[test]
fn index_accepts_universe_range() {
    assert_eq!(TypeId::NEVER.index(), Ok(0));
    assert_eq!(TypeId::from_raw(4095).index(), Ok(4095));
}

#[test]
fn index_rejects_out_of_range() {
    assert_eq!(
        TypeId::from_raw(4096).index(),
        Err(CoreError::InvalidTypeId { raw: 4096 })
    );
    assert_eq!(
        TypeId::from_raw(u64::MAX).index(),
        Err(CoreError::InvalidTypeId { raw: u64::MAX })
    );
    assert!(!TypeId::from_raw(4096).is_valid());
}

#[test]
fn display_uses_builtin_names() {
    assert_eq!(TypeId::INT.to_string(), "int");
    assert_eq!(TypeId::ANY.to_string(), "any");
    assert_eq!(TypeId::from_raw(100).to_string(), "type#100");
}

#[test]
fn debug_names_builtins() {
    assert_eq!(format!("{:?}", TypeId::NEVER), "TypeId::NEVER");
    assert_eq!(format!("{:?}", TypeId::from_raw(70)), "TypeId(70)");
}

#[test]
fn ids_order_numerically() {
    let mut ids = vec![TypeId::from_raw(9), TypeId::ANY, TypeId::from_raw(3)];
    ids.sort();
    assert_eq!(ids, vec![TypeId::ANY, TypeId::BOOL, TypeId::from_raw(9)]);
}
