use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::Rc;

/// Something that can capture its own state and later be rolled back to it.
/// Slots implement this; a transaction frame only ever sees participants
/// through this trait, so slots of different resource kinds can join the
/// same frame.
pub trait TransactionParticipant {
    fn take_snapshot(&self) -> Box<dyn Any>;
    fn restore_snapshot(&self, snapshot: Box<dyn Any>);
}

struct Touched {
    participant: Rc<dyn TransactionParticipant>,
    snapshot: Box<dyn Any>,
}

/// Receives a committing child frame's touched-set. Implemented by
/// `Transaction` itself; the indirection erases the parent's lifetime
/// parameter so frames can nest arbitrarily deep.
trait FrameSink {
    fn absorb(&mut self, touched: HashMap<usize, Touched>);
}

/// One open transaction frame.
///
/// Every provisionally-applied slot mutation registers its pre-frame state
/// here first. Dropping a frame without calling [`commit`](Self::commit)
/// aborts it: partial application is never silently kept.
///
/// Frames nest by mutable borrow, so closing a frame that is not the
/// innermost open one is rejected at compile time rather than at runtime.
///
/// All use is single-threaded; one logical operation drives one frame from
/// open to close.
pub struct Transaction<'a> {
    touched: HashMap<usize, Touched>,
    parent: Option<&'a mut dyn FrameSink>,
    open: bool,
}

impl<'a> Transaction<'a> {
    /// Opens a root frame. Committing it makes all recorded mutations
    /// permanent.
    pub fn open_outer() -> Transaction<'static> {
        Transaction {
            touched: HashMap::new(),
            parent: None,
            open: true,
        }
    }

    /// Opens a child frame. The parent is inaccessible until the child
    /// closes.
    pub fn open_nested(&mut self) -> Transaction<'_> {
        Transaction {
            touched: HashMap::new(),
            parent: Some(self),
            open: true,
        }
    }

    /// Records `participant`'s current state, unless this frame already
    /// holds a snapshot for it. First touch wins: later touches within the
    /// same frame must not overwrite the pre-frame value.
    ///
    /// Must be called before the participant's fields change.
    pub fn enlist(&mut self, participant: Rc<dyn TransactionParticipant>) {
        let key = Rc::as_ptr(&participant) as *const () as usize;
        if let Entry::Vacant(entry) = self.touched.entry(key) {
            let snapshot = participant.take_snapshot();
            entry.insert(Touched {
                participant,
                snapshot,
            });
        }
    }

    /// Closes the frame, keeping its mutations. A child hands its snapshots
    /// to the parent (which keeps its own, earlier snapshot for any slot
    /// both frames touched); a root frame simply forgets them.
    pub fn commit(mut self) {
        self.open = false;
        let touched = std::mem::take(&mut self.touched);
        if let Some(parent) = self.parent.as_mut() {
            parent.absorb(touched);
        }
    }

    /// Closes the frame, restoring every participant it touched to the state
    /// recorded when this frame first touched it. An enclosing frame, if
    /// any, stays open and is otherwise unaffected.
    pub fn abort(mut self) {
        self.rollback();
    }

    /// Number of participants this frame has snapshotted so far.
    pub fn touched_len(&self) -> usize {
        self.touched.len()
    }

    fn rollback(&mut self) {
        self.open = false;
        for (_, entry) in self.touched.drain() {
            entry.participant.restore_snapshot(entry.snapshot);
        }
    }
}

impl FrameSink for Transaction<'_> {
    fn absorb(&mut self, touched: HashMap<usize, Touched>) {
        for (key, entry) in touched {
            self.touched.entry(key).or_insert(entry);
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        // A frame that falls out of scope un-committed aborts.
        if self.open {
            self.rollback();
        }
    }
}
