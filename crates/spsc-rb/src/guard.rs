//! RAII scopes over `claim`/`publish` and `front`/`pop`, with explicit
//! arm/commit/cancel semantics.
//!
//! These are generic over the slot type `T`: for `fifo*` containers `T` is
//! the element type; for `pool*` containers `T = *mut u8`, since a pool is,
//! at the ring-core level, just a ring of pointers.

use crate::core::RingCore;
use crate::invariants::debug_assert_slot_non_null;
use crate::policy::Policy;
use std::mem::{align_of, size_of, MaybeUninit};

/// Single-slot producer scope. Constructed by a container's `scoped_write`
/// after a successful `try_claim`; falsy (inactive) otherwise.
pub struct WriteGuard<'a, T, P: Policy> {
    core: &'a RingCore<P>,
    ptr: *mut T,
    has_slot: bool,
    done: bool,
    publish_on_destroy: bool,
}

impl<'a, T, P: Policy> WriteGuard<'a, T, P> {
    /// # Safety
    /// `ptr` must be valid for one write of `T` for the lifetime of the
    /// guard, or `has_slot` must be `false`.
    pub unsafe fn new(core: &'a RingCore<P>, ptr: *mut T, has_slot: bool) -> Self {
        Self {
            core,
            ptr,
            has_slot,
            done: false,
            publish_on_destroy: false,
        }
    }

    pub fn inactive(core: &'a RingCore<P>) -> Self {
        unsafe { Self::new(core, std::ptr::null_mut(), false) }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.has_slot && !self.done
    }

    /// Exposes the slot without arming publish.
    pub fn peek(&self) -> Option<&T> {
        self.is_active().then(|| unsafe { &*self.ptr })
    }

    /// Exposes the slot and arms publish-on-destroy.
    pub fn get(&mut self) -> Option<&mut T> {
        if !self.is_active() {
            return None;
        }
        self.publish_on_destroy = true;
        Some(unsafe { &mut *self.ptr })
    }

    /// Arms publish-on-destroy without reading the slot.
    pub fn arm_publish(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.publish_on_destroy = true;
        true
    }

    /// Publishes immediately and deactivates the guard.
    pub fn commit(mut self) -> bool {
        if !self.is_active() {
            self.done = true;
            return false;
        }
        self.core.increment_head();
        self.done = true;
        true
    }

    /// Deactivates without publishing.
    pub fn cancel(mut self) {
        self.done = true;
    }
}

impl<'a, T, P: Policy> std::ops::Deref for WriteGuard<'a, T, P> {
    type Target = T;
    fn deref(&self) -> &T {
        self.peek()
            .expect("spsc-rb: WriteGuard::deref on an inactive guard")
    }
}

impl<'a, T, P: Policy> std::ops::DerefMut for WriteGuard<'a, T, P> {
    fn deref_mut(&mut self) -> &mut T {
        self.get()
            .expect("spsc-rb: WriteGuard::deref_mut on an inactive guard")
    }
}

impl<'a, T, P: Policy> Drop for WriteGuard<'a, T, P> {
    fn drop(&mut self) {
        if self.is_active() && self.publish_on_destroy {
            self.core.increment_head();
        }
    }
}

/// Single-slot consumer scope. Constructed by a container's `scoped_read`
/// after a successful `try_front`; falsy otherwise.
pub struct ReadGuard<'a, T, P: Policy> {
    core: &'a RingCore<P>,
    ptr: *const T,
    has_slot: bool,
    done: bool,
}

impl<'a, T, P: Policy> ReadGuard<'a, T, P> {
    /// # Safety
    /// `ptr` must be valid for one read of `T` for the lifetime of the
    /// guard, or `has_slot` must be `false`.
    pub unsafe fn new(core: &'a RingCore<P>, ptr: *const T, has_slot: bool) -> Self {
        Self {
            core,
            ptr,
            has_slot,
            done: false,
        }
    }

    pub fn inactive(core: &'a RingCore<P>) -> Self {
        unsafe { Self::new(core, std::ptr::null(), false) }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.has_slot && !self.done
    }

    pub fn peek(&self) -> Option<&T> {
        self.is_active().then(|| unsafe { &*self.ptr })
    }

    /// Pops immediately and deactivates the guard.
    pub fn commit(mut self) -> bool {
        if !self.is_active() {
            self.done = true;
            return false;
        }
        self.core.increment_tail();
        self.done = true;
        true
    }

    /// Deactivates without popping.
    pub fn cancel(mut self) {
        self.done = true;
    }
}

impl<'a, T, P: Policy> std::ops::Deref for ReadGuard<'a, T, P> {
    type Target = T;
    fn deref(&self) -> &T {
        self.peek()
            .expect("spsc-rb: ReadGuard::deref on an inactive guard")
    }
}

impl<'a, T, P: Policy> Drop for ReadGuard<'a, T, P> {
    fn drop(&mut self) {
        if self.is_active() {
            self.core.increment_tail();
        }
    }
}

/// Bulk producer scope over an exact-`n` claim. Inactive (`claimed == 0`)
/// if fewer than `n` slots were free at construction.
pub struct BulkWriteGuard<'a, T, P: Policy> {
    core: &'a RingCore<P>,
    first_ptr: *mut T,
    first_count: usize,
    second_ptr: *mut T,
    claimed: usize,
    constructed: usize,
    done: bool,
    /// Set once ownership of `[0, constructed)` has been handed to the ring
    /// (via `commit` or a publish-on-destroy), so `Drop` never re-publishes
    /// or drops values the consumer may already see.
    published: bool,
    publish_on_destroy: bool,
}

impl<'a, T, P: Policy> BulkWriteGuard<'a, T, P> {
    /// # Safety
    /// `first_ptr`/`second_ptr` must be valid for writes covering
    /// `first_count`/`claimed - first_count` elements respectively, or
    /// `claimed` must be zero. Every slot in that range must already hold a
    /// live, valid `T` (never uninitialized) — `emplace_next` drops the
    /// existing value as part of overwriting it.
    pub unsafe fn new(
        core: &'a RingCore<P>,
        first_ptr: *mut T,
        first_count: usize,
        second_ptr: *mut T,
        claimed: usize,
    ) -> Self {
        Self {
            core,
            first_ptr,
            first_count,
            second_ptr,
            claimed,
            constructed: 0,
            done: false,
            published: false,
            publish_on_destroy: false,
        }
    }

    pub fn inactive(core: &'a RingCore<P>) -> Self {
        unsafe { Self::new(core, std::ptr::null_mut(), 0, std::ptr::null_mut(), 0) }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.claimed > 0 && !self.done
    }

    #[inline]
    pub fn claimed(&self) -> usize {
        self.claimed
    }

    #[inline]
    pub fn constructed(&self) -> usize {
        self.constructed
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.claimed - self.constructed
    }

    fn slot_ptr(&self, i: usize) -> *mut T {
        if i < self.first_count {
            unsafe { self.first_ptr.add(i) }
        } else {
            unsafe { self.second_ptr.add(i - self.first_count) }
        }
    }

    /// Exposes the next slot as `MaybeUninit`, without advancing the
    /// constructed count; pair with [`Self::mark_written`].
    ///
    /// The slot in fact already holds a live, valid `T` left over from a
    /// previous cycle; writing through the returned `MaybeUninit` (e.g. via
    /// `MaybeUninit::write`) overwrites it without running its destructor.
    /// Prefer [`Self::emplace_next`]/[`Self::write_next`] for any `T` whose
    /// `Drop` impl matters — this lower-level pair is for callers who know
    /// the stale value needs no cleanup (e.g. `Copy` types).
    pub fn next_uninit(&mut self) -> Option<&mut MaybeUninit<T>> {
        if self.remaining() == 0 {
            return None;
        }
        let ptr = self.slot_ptr(self.constructed).cast::<MaybeUninit<T>>();
        Some(unsafe { &mut *ptr })
    }

    /// Marks the most recently exposed `next_uninit` slot as written.
    pub fn mark_written(&mut self) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.constructed += 1;
        true
    }

    /// Assigns `value` into the next slot and advances the constructed count
    /// in one step. The slot already holds a valid (if stale, left over from
    /// a previous cycle) `T`; this drops that old value the same way a plain
    /// assignment would, rather than placement-writing over it, so reusing a
    /// claim across wrap-around never leaks a non-`Copy` payload.
    pub fn emplace_next(&mut self, value: T) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        let ptr = self.slot_ptr(self.constructed);
        unsafe { *ptr = value };
        self.constructed += 1;
        true
    }

    /// Copies `src` into the next slot and advances the constructed count.
    pub fn write_next(&mut self, src: &T) -> bool
    where
        T: Clone,
    {
        self.emplace_next(src.clone())
    }

    /// Requires `constructed() > 0`. Arms publish-on-destroy.
    pub fn arm_publish(&mut self) -> bool {
        if self.constructed == 0 || self.done {
            return false;
        }
        self.publish_on_destroy = true;
        true
    }

    /// Publishes `constructed()` slots immediately and deactivates.
    pub fn commit(mut self) -> usize {
        let published = if self.is_active() {
            self.core.advance_head(self.constructed as u64);
            self.published = true;
            self.constructed
        } else {
            0
        };
        self.done = true;
        published
    }

    /// Deactivates without publishing. Any slots already constructed via
    /// `emplace_next`/`write_next`/`mark_written` are dropped in place
    /// (by `Drop`) rather than left to leak or become visible to the
    /// consumer.
    pub fn cancel(mut self) {
        self.done = true;
    }
}

impl<'a, T, P: Policy> Drop for BulkWriteGuard<'a, T, P> {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        if self.is_active() && self.publish_on_destroy {
            self.core.advance_head(self.constructed as u64);
            self.published = true;
            return;
        }
        // Not published: the constructed prefix holds live values nobody
        // will ever read through the ring. Drop them in place so non-`Copy`
        // payloads don't leak when a claim is cancelled or dropped unarmed.
        for i in 0..self.constructed {
            unsafe { std::ptr::drop_in_place(self.slot_ptr(i)) };
        }
    }
}

/// Bulk consumer scope over an exact-`n` claim. Inactive (`claimed == 0`)
/// if fewer than `n` slots were available at construction.
pub struct BulkReadGuard<'a, T, P: Policy> {
    core: &'a RingCore<P>,
    first_ptr: *const T,
    first_count: usize,
    second_ptr: *const T,
    second_count: usize,
    claimed: usize,
    done: bool,
}

impl<'a, T, P: Policy> BulkReadGuard<'a, T, P> {
    /// # Safety
    /// `first_ptr`/`second_ptr` must be valid for reads covering
    /// `first_count`/`second_count` elements respectively, or `claimed`
    /// must be zero.
    pub unsafe fn new(
        core: &'a RingCore<P>,
        first_ptr: *const T,
        first_count: usize,
        second_ptr: *const T,
        second_count: usize,
        claimed: usize,
    ) -> Self {
        Self {
            core,
            first_ptr,
            first_count,
            second_ptr,
            second_count,
            claimed,
            done: false,
        }
    }

    pub fn inactive(core: &'a RingCore<P>) -> Self {
        unsafe { Self::new(core, std::ptr::null(), 0, std::ptr::null(), 0, 0) }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.claimed > 0 && !self.done
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.claimed
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.claimed == 0
    }

    pub fn first(&self) -> &[T] {
        if self.first_count == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.first_ptr, self.first_count) }
        }
    }

    pub fn second(&self) -> &[T] {
        if self.second_count == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.second_ptr, self.second_count) }
        }
    }

    /// Pops `len()` slots immediately and deactivates.
    pub fn commit(mut self) -> usize {
        let popped = if self.is_active() {
            self.core.advance_tail(self.claimed as u64);
            self.claimed
        } else {
            0
        };
        self.done = true;
        popped
    }

    /// Deactivates without popping.
    pub fn cancel(mut self) {
        self.done = true;
    }
}

impl<'a, T, P: Policy> Drop for BulkReadGuard<'a, T, P> {
    fn drop(&mut self) {
        if self.is_active() {
            self.core.advance_tail(self.claimed as u64);
        }
    }
}

// ---------------------------------------------------------------------------
// Pool guards.
//
// A pool's ring-core slots are table entries (`*mut u8`, pointing at a fixed-
// size backing buffer), one indirection deeper than a fifo's slots. Writing
// to a pool means copying bytes through the pointer the table entry holds,
// never reassigning the entry itself, so these guards are not the generic
// `WriteGuard<T, P>`/`BulkWriteGuard<T, P>` instantiated at `T = *mut u8`.
// ---------------------------------------------------------------------------

/// Single-slot producer scope over one pool buffer. Inactive when the ring
/// was full, or (views only) when the table entry at the claimed index is
/// null. The null check happens once, at construction, so the buffer
/// pointer is never dereferenced otherwise.
pub struct PoolWriteGuard<'a, P: Policy> {
    core: &'a RingCore<P>,
    slot: *mut u8,
    buffer_size: usize,
    has_slot: bool,
    done: bool,
    publish_on_destroy: bool,
}

impl<'a, P: Policy> PoolWriteGuard<'a, P> {
    /// # Safety
    /// `slot` must be valid for writes of `buffer_size` bytes for the
    /// lifetime of the guard, or `has_slot` must be `false`.
    pub unsafe fn new(core: &'a RingCore<P>, slot: *mut u8, buffer_size: usize, has_slot: bool) -> Self {
        Self {
            core,
            slot,
            buffer_size,
            has_slot,
            done: false,
            publish_on_destroy: false,
        }
    }

    pub fn inactive(core: &'a RingCore<P>, buffer_size: usize) -> Self {
        unsafe { Self::new(core, std::ptr::null_mut(), buffer_size, false) }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.has_slot && !self.done
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The claimed buffer's address, for tests and typed-view validation.
    /// `None` if the guard is inactive.
    pub fn slot_ptr(&self) -> Option<*mut u8> {
        self.is_active().then_some(self.slot)
    }

    #[inline]
    fn aligned_for<U>(&self) -> bool {
        (self.slot as usize) % align_of::<U>() == 0
    }

    /// Exposes the full buffer for direct byte-level writes. Arms publish.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        if !self.is_active() {
            return None;
        }
        debug_assert_slot_non_null!(self.slot);
        self.publish_on_destroy = true;
        Some(unsafe { std::slice::from_raw_parts_mut(self.slot, self.buffer_size) })
    }

    /// Copies up to `min(src.len(), buffer_size())` bytes into the buffer.
    /// Arms publish. A zero-length `src` is a legal no-op that still arms
    /// the guard (the claimed slot is still consumed on commit).
    pub fn write(&mut self, src: &[u8]) -> bool {
        if !self.is_active() {
            return false;
        }
        debug_assert_slot_non_null!(self.slot);
        let len = src.len().min(self.buffer_size);
        if len > 0 {
            unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), self.slot, len) };
        }
        self.publish_on_destroy = true;
        true
    }

    /// Constructs `value: U` into the buffer, iff `U` fits `buffer_size` and
    /// the buffer is aligned to `align_of::<U>()`. Arms publish.
    pub fn write_value<U>(&mut self, value: U) -> bool {
        if !self.is_active() || size_of::<U>() > self.buffer_size || !self.aligned_for::<U>() {
            return false;
        }
        unsafe { self.slot.cast::<U>().write(value) };
        self.publish_on_destroy = true;
        true
    }

    pub fn arm_publish(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.publish_on_destroy = true;
        true
    }

    pub fn commit(mut self) -> bool {
        if !self.is_active() {
            self.done = true;
            return false;
        }
        self.core.increment_head();
        self.done = true;
        true
    }

    pub fn cancel(mut self) {
        self.done = true;
    }
}

impl<'a, P: Policy> Drop for PoolWriteGuard<'a, P> {
    fn drop(&mut self) {
        if self.is_active() && self.publish_on_destroy {
            self.core.increment_head();
        }
    }
}

/// Single-slot consumer scope over one pool buffer. Inactive when the ring
/// was empty, or (views only) when the table entry is null.
pub struct PoolReadGuard<'a, P: Policy> {
    core: &'a RingCore<P>,
    slot: *const u8,
    buffer_size: usize,
    has_slot: bool,
    done: bool,
}

impl<'a, P: Policy> PoolReadGuard<'a, P> {
    /// # Safety
    /// `slot` must be valid for reads of `buffer_size` bytes for the
    /// lifetime of the guard, or `has_slot` must be `false`.
    pub unsafe fn new(core: &'a RingCore<P>, slot: *const u8, buffer_size: usize, has_slot: bool) -> Self {
        Self {
            core,
            slot,
            buffer_size,
            has_slot,
            done: false,
        }
    }

    pub fn inactive(core: &'a RingCore<P>, buffer_size: usize) -> Self {
        unsafe { Self::new(core, std::ptr::null(), buffer_size, false) }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.has_slot && !self.done
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The front buffer's address, or `None` if the guard is inactive.
    pub fn slot_ptr(&self) -> Option<*const u8> {
        self.is_active().then_some(self.slot)
    }

    pub fn as_slice(&self) -> Option<&[u8]> {
        if !self.is_active() {
            return None;
        }
        debug_assert_slot_non_null!(self.slot);
        Some(unsafe { std::slice::from_raw_parts(self.slot, self.buffer_size) })
    }

    /// Reads the front buffer as `&U`, iff `U` fits and the buffer is
    /// aligned to `align_of::<U>()`.
    pub fn as_ref<U>(&self) -> Option<&U> {
        if !self.is_active()
            || size_of::<U>() > self.buffer_size
            || (self.slot as usize) % align_of::<U>() != 0
        {
            return None;
        }
        Some(unsafe { &*self.slot.cast::<U>() })
    }

    pub fn commit(mut self) -> bool {
        if !self.is_active() {
            self.done = true;
            return false;
        }
        self.core.increment_tail();
        self.done = true;
        true
    }

    pub fn cancel(mut self) {
        self.done = true;
    }
}

impl<'a, P: Policy> Drop for PoolReadGuard<'a, P> {
    fn drop(&mut self) {
        if self.is_active() {
            self.core.increment_tail();
        }
    }
}

/// Bulk producer scope over an exact-`n` claim of pool table entries.
/// `write_next` dereferences a table entry only at the moment of writing,
/// and treats a null entry as a failed write rather than a dereference.
/// This is what lets `claim_write` on a view with a null entry stay safe
/// even when the caller never checks `slot_ptr_at` first.
pub struct BulkPoolWriteGuard<'a, P: Policy> {
    core: &'a RingCore<P>,
    first_table: *const *mut u8,
    first_count: usize,
    second_table: *const *mut u8,
    claimed: usize,
    buffer_size: usize,
    constructed: usize,
    done: bool,
    publish_on_destroy: bool,
}

impl<'a, P: Policy> BulkPoolWriteGuard<'a, P> {
    /// # Safety
    /// `first_table`/`second_table` must be valid for reads covering
    /// `first_count`/`claimed - first_count` pointers respectively, or
    /// `claimed` must be zero.
    pub unsafe fn new(
        core: &'a RingCore<P>,
        first_table: *const *mut u8,
        first_count: usize,
        second_table: *const *mut u8,
        claimed: usize,
        buffer_size: usize,
    ) -> Self {
        Self {
            core,
            first_table,
            first_count,
            second_table,
            claimed,
            buffer_size,
            constructed: 0,
            done: false,
            publish_on_destroy: false,
        }
    }

    pub fn inactive(core: &'a RingCore<P>, buffer_size: usize) -> Self {
        unsafe { Self::new(core, std::ptr::null(), 0, std::ptr::null(), 0, buffer_size) }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.claimed > 0 && !self.done
    }

    #[inline]
    pub fn claimed(&self) -> usize {
        self.claimed
    }

    #[inline]
    pub fn constructed(&self) -> usize {
        self.constructed
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.claimed - self.constructed
    }

    /// The table entry at claim-relative position `i`: reads the pointer
    /// table itself (always valid memory) without touching what it points
    /// to, so this may legitimately return null on a defensively-tested
    /// view.
    pub fn slot_ptr_at(&self, i: usize) -> *mut u8 {
        debug_assert!(i < self.claimed, "spsc-rb: pool bulk index out of range");
        if i < self.first_count {
            unsafe { *self.first_table.add(i) }
        } else {
            unsafe { *self.second_table.add(i - self.first_count) }
        }
    }

    /// Copies `src` into the next slot and advances the constructed count.
    /// Fails without dereferencing if the table entry is null.
    pub fn write_next(&mut self, src: &[u8]) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        let slot = self.slot_ptr_at(self.constructed);
        if slot.is_null() {
            return false;
        }
        let len = src.len().min(self.buffer_size);
        if len > 0 {
            unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), slot, len) };
        }
        self.constructed += 1;
        true
    }

    pub fn arm_publish(&mut self) -> bool {
        if self.constructed == 0 || self.done {
            return false;
        }
        self.publish_on_destroy = true;
        true
    }

    pub fn commit(mut self) -> usize {
        let published = if self.is_active() {
            self.core.advance_head(self.constructed as u64);
            self.constructed
        } else {
            0
        };
        self.done = true;
        published
    }

    pub fn cancel(mut self) {
        self.done = true;
    }
}

impl<'a, P: Policy> Drop for BulkPoolWriteGuard<'a, P> {
    fn drop(&mut self) {
        if self.is_active() && self.publish_on_destroy {
            self.core.advance_head(self.constructed as u64);
        }
    }
}

/// Bulk consumer scope over an exact-`n` claim of pool table entries.
pub struct BulkPoolReadGuard<'a, P: Policy> {
    core: &'a RingCore<P>,
    first_table: *const *mut u8,
    first_count: usize,
    second_table: *const *mut u8,
    second_count: usize,
    claimed: usize,
    buffer_size: usize,
    done: bool,
}

impl<'a, P: Policy> BulkPoolReadGuard<'a, P> {
    /// # Safety
    /// `first_table`/`second_table` must be valid for reads covering
    /// `first_count`/`second_count` pointers respectively, or `claimed`
    /// must be zero.
    pub unsafe fn new(
        core: &'a RingCore<P>,
        first_table: *const *mut u8,
        first_count: usize,
        second_table: *const *mut u8,
        second_count: usize,
        claimed: usize,
        buffer_size: usize,
    ) -> Self {
        Self {
            core,
            first_table,
            first_count,
            second_table,
            second_count,
            claimed,
            buffer_size,
            done: false,
        }
    }

    pub fn inactive(core: &'a RingCore<P>, buffer_size: usize) -> Self {
        unsafe { Self::new(core, std::ptr::null(), 0, std::ptr::null(), 0, 0, buffer_size) }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.claimed > 0 && !self.done
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.claimed
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.claimed == 0
    }

    pub fn table_first(&self) -> &[*mut u8] {
        if self.first_count == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.first_table, self.first_count) }
        }
    }

    pub fn table_second(&self) -> &[*mut u8] {
        if self.second_count == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.second_table, self.second_count) }
        }
    }

    /// The payload bytes behind claim-relative position `i`, or `None` if
    /// that table entry is null.
    pub fn payload_at(&self, i: usize) -> Option<&[u8]> {
        debug_assert!(i < self.claimed, "spsc-rb: pool bulk index out of range");
        let slot = if i < self.first_count {
            self.table_first()[i]
        } else {
            self.table_second()[i - self.first_count]
        };
        if slot.is_null() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(slot, self.buffer_size) })
    }

    pub fn commit(mut self) -> usize {
        let popped = if self.is_active() {
            self.core.advance_tail(self.claimed as u64);
            self.claimed
        } else {
            0
        };
        self.done = true;
        popped
    }

    pub fn cancel(mut self) {
        self.done = true;
    }
}

impl<'a, P: Policy> Drop for BulkPoolReadGuard<'a, P> {
    fn drop(&mut self) {
        if self.is_active() {
            self.core.advance_tail(self.claimed as u64);
        }
    }
}
