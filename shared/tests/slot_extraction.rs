mod common;

use common::{meta, tagged_meta, TestResource};
use machina_shared::{accept_all, Metadata, ResourceSlot, TransferType};

const CAPACITY: u64 = 64;

fn filled_slot(amount: u64) -> ResourceSlot<TestResource> {
    let slot = ResourceSlot::new(TransferType::Storage, accept_all(), CAPACITY);
    slot.set(Some(TestResource::Iron), Metadata::empty(), amount);
    slot
}

#[test]
fn empty_slot_yields_nothing() {
    let slot: ResourceSlot<TestResource> =
        ResourceSlot::new(TransferType::Storage, accept_all(), CAPACITY);
    assert_eq!(slot.extract(&TestResource::Iron, &meta(), 4, None), 0);
    assert_eq!(slot.extract_any(4, None), 0);
}

#[test]
fn extraction_is_clamped_to_contents() {
    let slot = filled_slot(10);
    assert_eq!(slot.extract(&TestResource::Iron, &meta(), 100, None), 10);
    assert!(slot.is_empty());
}

#[test]
fn partial_extraction_leaves_remainder() {
    let slot = filled_slot(10);
    assert_eq!(slot.extract(&TestResource::Iron, &meta(), 4, None), 4);
    assert_eq!(slot.amount(), 6);
    assert_eq!(slot.resource(), Some(TestResource::Iron));
}

#[test]
fn wrong_resource_yields_nothing() {
    let slot = filled_slot(10);
    assert_eq!(slot.extract(&TestResource::Copper, &meta(), 4, None), 0);
    assert_eq!(slot.amount(), 10);
}

#[test]
fn wrong_metadata_yields_nothing() {
    let slot = filled_slot(10);
    assert_eq!(slot.extract(&TestResource::Iron, &tagged_meta(), 4, None), 0);
    assert_eq!(slot.amount(), 10);
}

#[test]
fn kind_only_extract_ignores_metadata() {
    let slot = ResourceSlot::new(TransferType::Storage, accept_all(), CAPACITY);
    slot.set(Some(TestResource::Iron), tagged_meta(), 10);

    assert_eq!(slot.try_extract_kind(&TestResource::Copper, 4), 0);
    assert_eq!(slot.extract_kind(&TestResource::Iron, 4, None), 4);
    assert_eq!(slot.amount(), 6);
    assert_eq!(slot.metadata(), tagged_meta());
}

#[test]
fn extract_any_ignores_the_held_pair() {
    let slot = filled_slot(10);
    assert_eq!(slot.extract_any(4, None), 4);
    assert_eq!(slot.amount(), 6);
}

#[test]
fn draining_resets_resource_and_metadata_together() {
    let slot = ResourceSlot::new(TransferType::Storage, accept_all(), CAPACITY);
    slot.set(Some(TestResource::Iron), tagged_meta(), 3);

    assert_eq!(slot.extract(&TestResource::Iron, &tagged_meta(), 3, None), 3);
    assert_eq!(slot.resource(), None);
    assert!(slot.metadata().is_empty());
    assert_eq!(slot.amount(), 0);
}

#[test]
fn try_extract_previews_without_mutating() {
    let slot = filled_slot(10);
    let before = slot.modifications();
    assert_eq!(slot.try_extract(&TestResource::Iron, &meta(), 100), 10);
    assert_eq!(slot.try_extract_any(3), 3);
    assert_eq!(slot.amount(), 10);
    assert_eq!(slot.modifications(), before);

    assert!(slot.can_extract(&TestResource::Iron, &meta(), 10));
    assert!(!slot.can_extract(&TestResource::Iron, &meta(), 11));
}

#[test]
fn zero_amount_extracts_nothing() {
    let slot = filled_slot(10);
    assert_eq!(slot.extract(&TestResource::Iron, &meta(), 0, None), 0);
    assert_eq!(slot.amount(), 10);
}

#[test]
fn empty_invariant_holds_across_operations() {
    let slot = ResourceSlot::new(TransferType::Storage, accept_all(), CAPACITY);
    for _ in 0..5 {
        slot.insert(&TestResource::Iron, &meta(), 3, None);
        slot.extract(&TestResource::Iron, &meta(), 3, None);
        assert_eq!(slot.amount() == 0, slot.resource().is_none());
    }
    assert!(slot.is_empty());
}
