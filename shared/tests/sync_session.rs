mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::{meta, registry, TestResource};
use machina_shared::{
    accept_all, ResourceSlot, StorageAggregate, SyncSession, TransferType,
};

fn scalar(value: u64) -> Rc<Cell<u64>> {
    Rc::new(Cell::new(value))
}

fn register_scalar(session: &mut SyncSession, cell: &Rc<Cell<u64>>) {
    let get = cell.clone();
    let set = cell.clone();
    session.register_scalar(move || get.get(), move |value| set.set(value));
}

fn storage() -> StorageAggregate<TestResource> {
    StorageAggregate::builder()
        .add_slot(TransferType::Input, accept_all(), 10)
        .add_slot(TransferType::Input, accept_all(), 10)
        .add_slot(TransferType::Output, accept_all(), 10)
        .build()
}

#[test]
fn initial_payload_seeds_a_fresh_observer() {
    let registry = registry();

    let host_progress = scalar(42);
    let host_slot: ResourceSlot<TestResource> =
        ResourceSlot::new(TransferType::Storage, accept_all(), 10);
    host_slot.insert(&TestResource::Iron, &meta(), 6, None);

    let mut host = SyncSession::new();
    register_scalar(&mut host, &host_progress);
    host.register_slot(&host_slot, registry.clone());

    let client_progress = scalar(0);
    let client_slot: ResourceSlot<TestResource> =
        ResourceSlot::new(TransferType::Storage, accept_all(), 10);

    let mut client = SyncSession::new();
    register_scalar(&mut client, &client_progress);
    client.register_slot(&client_slot, registry);

    let baseline = host.initial();
    client.apply_initial(&baseline).unwrap();

    assert_eq!(client_progress.get(), 42);
    assert_eq!(client_slot.contents(), (Some(TestResource::Iron), meta(), 6));
}

#[test]
fn quiet_ticks_send_nothing() {
    let progress = scalar(7);
    let mut host = SyncSession::new();
    register_scalar(&mut host, &progress);

    // nothing has moved since registration
    assert!(host.sample().is_none());

    progress.set(8);
    assert!(host.sample().is_some());
    // the send acknowledged the new value
    assert!(host.sample().is_none());
}

#[test]
fn partial_change_produces_a_sparse_frame() {
    let cells: Vec<Rc<Cell<u64>>> = (0..5).map(scalar).collect();
    let mut host = SyncSession::new();
    for cell in &cells {
        register_scalar(&mut host, cell);
    }

    cells[1].set(100);
    cells[4].set(400);
    let frame = host.sample().unwrap();

    // sparse mode, two addressed fields
    assert_eq!(frame[0], 1);
    assert_eq!(frame[1], 2);

    let client_cells: Vec<Rc<Cell<u64>>> = (0..5).map(scalar).collect();
    let mut client = SyncSession::new();
    for cell in &client_cells {
        register_scalar(&mut client, cell);
    }
    client.apply(&frame).unwrap();

    assert_eq!(client_cells[0].get(), 0);
    assert_eq!(client_cells[1].get(), 100);
    assert_eq!(client_cells[2].get(), 2);
    assert_eq!(client_cells[4].get(), 400);
}

#[test]
fn five_of_five_changes_produce_a_full_frame() {
    let cells: Vec<Rc<Cell<u64>>> = (0..5).map(scalar).collect();
    let mut host = SyncSession::new();
    for cell in &cells {
        register_scalar(&mut host, cell);
    }

    for cell in &cells {
        cell.set(cell.get() + 9);
    }
    let frame = host.sample().unwrap();

    // full mode: no count or index bytes, just five u64 payloads
    assert_eq!(frame[0], 0);
    assert_eq!(frame.len(), 1 + 5 * 8);

    let client_cells: Vec<Rc<Cell<u64>>> = (0..5).map(|_| scalar(0)).collect();
    let mut client = SyncSession::new();
    for cell in &client_cells {
        register_scalar(&mut client, cell);
    }
    client.apply(&frame).unwrap();

    for (index, cell) in client_cells.iter().enumerate() {
        assert_eq!(cell.get(), index as u64 + 9);
    }
}

#[test]
fn total_change_produces_a_full_frame() {
    let cells: Vec<Rc<Cell<u64>>> = (0..3).map(scalar).collect();
    let mut host = SyncSession::new();
    for cell in &cells {
        register_scalar(&mut host, cell);
    }

    for cell in &cells {
        cell.set(cell.get() + 50);
    }
    let frame = host.sample().unwrap();
    assert_eq!(frame[0], 0);

    let client_cells: Vec<Rc<Cell<u64>>> = (0..3).map(|_| scalar(0)).collect();
    let mut client = SyncSession::new();
    for cell in &client_cells {
        register_scalar(&mut client, cell);
    }
    client.apply(&frame).unwrap();

    assert_eq!(client_cells[0].get(), 50);
    assert_eq!(client_cells[1].get(), 51);
    assert_eq!(client_cells[2].get(), 52);
}

#[test]
fn malformed_frames_are_rejected() {
    let mut session = SyncSession::new();
    register_scalar(&mut session, &scalar(0));

    assert!(session.apply(&[]).is_err());
    assert!(session.apply(&[9]).is_err());
    // sparse frame addressing a field that does not exist
    assert!(session.apply(&[1, 1, 200, 0]).is_err());
}

#[test]
fn bit_flags_pack_into_whole_bytes() {
    let flags = Rc::new(RefCell::new(vec![false; 9]));
    flags.borrow_mut()[0] = true;
    flags.borrow_mut()[3] = true;
    flags.borrow_mut()[8] = true;

    let mut host = SyncSession::new();
    host.register_bits(flags.clone());

    // nine flags fit in exactly two bytes
    let baseline = host.initial();
    assert_eq!(baseline.len(), 2);
    assert_eq!(baseline[0], 0b0000_1001);
    assert_eq!(baseline[1], 0b0000_0001);

    let observed = Rc::new(RefCell::new(vec![false; 9]));
    let mut client = SyncSession::new();
    client.register_bits(observed.clone());
    client.apply_initial(&baseline).unwrap();

    assert_eq!(*observed.borrow(), *flags.borrow());

    // eight flags pack into exactly one byte, not two
    let mut eight = SyncSession::new();
    eight.register_bits(Rc::new(RefCell::new(vec![true; 8])));
    assert_eq!(eight.initial(), vec![0xff]);
}

#[test]
fn bit_flag_changes_flow_through_sampling() {
    let flags = Rc::new(RefCell::new(vec![false; 6]));
    let mut host = SyncSession::new();
    host.register_bits(flags.clone());
    // a second field keeps the frame sparse
    register_scalar(&mut host, &scalar(0));
    host.initial();

    assert!(host.sample().is_none());
    flags.borrow_mut()[5] = true;
    let frame = host.sample().unwrap();
    assert_eq!(frame[0], 1);

    let observed = Rc::new(RefCell::new(vec![false; 6]));
    let mut client = SyncSession::new();
    client.register_bits(observed.clone());
    register_scalar(&mut client, &scalar(0));
    client.apply(&frame).unwrap();

    assert!(observed.borrow()[5]);
}

#[test]
fn storage_deltas_address_only_the_slots_that_moved() {
    let registry = registry();
    let host_storage = storage();
    host_storage.insert(&TestResource::Iron, &meta(), 15, None);

    let mut host = SyncSession::new();
    host.register_storage(&host_storage, registry.clone());
    // a second field keeps sampled frames sparse
    let tick = scalar(0);
    register_scalar(&mut host, &tick);

    let client_storage = storage();
    let mut client = SyncSession::new();
    client.register_storage(&client_storage, registry);
    register_scalar(&mut client, &scalar(0));

    client.apply_initial(&host.initial()).unwrap();
    assert_eq!(client_storage.slot(0).amount(), 10);
    assert_eq!(client_storage.slot(1).amount(), 5);

    // move one slot only
    host_storage
        .slot(1)
        .extract(&TestResource::Iron, &meta(), 2, None);
    let before = (
        client_storage.slot(0).modifications(),
        client_storage.slot(2).modifications(),
    );
    let frame = host.sample().unwrap();
    assert_eq!(frame[0], 1);
    client.apply(&frame).unwrap();

    assert_eq!(client_storage.slot(1).amount(), 3);
    // untouched slots were not rewritten
    assert_eq!(
        (
            client_storage.slot(0).modifications(),
            client_storage.slot(2).modifications(),
        ),
        before
    );

    assert!(host.sample().is_none());
}

#[test]
fn storage_delta_collapses_to_the_full_body_when_every_slot_moved() {
    let registry = registry();
    let host_storage = storage();
    let mut host = SyncSession::new();
    host.register_storage(&host_storage, registry.clone());
    let tick = scalar(0);
    register_scalar(&mut host, &tick);
    host.initial();

    for slot in host_storage.slots() {
        slot.insert(&TestResource::Copper, &meta(), 1, None);
    }
    let frame = host.sample().unwrap();
    assert_eq!(frame[0], 1);

    let client_storage = storage();
    let mut client = SyncSession::new();
    client.register_storage(&client_storage, registry);
    register_scalar(&mut client, &scalar(0));
    client.apply(&frame).unwrap();

    for slot in client_storage.slots() {
        assert_eq!(slot.contents(), (Some(TestResource::Copper), meta(), 1));
    }
}

#[test]
fn slot_fields_ignore_counter_bumps_with_no_visible_change() {
    let registry = registry();
    let slot: ResourceSlot<TestResource> =
        ResourceSlot::new(TransferType::Storage, accept_all(), 10);

    let mut host = SyncSession::new();
    host.register_slot(&slot, registry);

    slot.mark_modified();
    assert!(host.sample().is_none());
}
