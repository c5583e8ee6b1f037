//! Shared channel: the memory region both threads touch.
//!
//! Memory Layout (bit-exact, little-endian host order):
//!   - Control word (4 bytes, offset 0): `ChannelState` as u32
//!   - Text buffer (`capacity` bytes, offset 4): UTF-8, zero padded,
//!     first zero byte terminates the logical string
//!
//! No business logic lives here. Who may write the buffer is decided by the
//! state machine in `pipeline::bridge` and `input::responder`.

use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::ChannelError;
use crate::pipeline::wake;
use crate::types::ChannelState;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Offset of the control word.
pub const H_CONTROL: usize = 0;

/// Size of the control word in bytes.
pub const CONTROL_WORD_SIZE: usize = std::mem::size_of::<AtomicU32>();

/// Offset of the text buffer.
pub const TEXT_OFFSET: usize = H_CONTROL + CONTROL_WORD_SIZE;

/// Default text capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 8192;

/// Required alignment of the whole region (the control word's).
pub const REGION_ALIGN: usize = std::mem::align_of::<AtomicU32>();

/// One recorded move of the control word: `(from, to, forced)`.
#[cfg(test)]
pub(crate) type Transition = (ChannelState, ChannelState, bool);

/// Total region size for a given text capacity.
pub const fn region_size(capacity: usize) -> usize {
    TEXT_OFFSET + capacity
}

// =============================================================================
// SHARED CHANNEL
// =============================================================================

/// Control word + fixed-capacity text buffer shared by the worker and the
/// foreground.
pub struct SharedChannel {
    ptr: NonNull<u8>,
    capacity: usize,
    /// `Some` when this channel allocated the region and must free it.
    owned: Option<Layout>,
    #[cfg(test)]
    transitions: std::sync::Mutex<Vec<Transition>>,
}

// SAFETY: The control word is only accessed atomically. The text buffer is
// written by one side at a time, as ordered by SeqCst transitions of the
// control word (Waiting → foreground writes → Ready → background reads).
unsafe impl Send for SharedChannel {}
unsafe impl Sync for SharedChannel {}

impl SharedChannel {
    /// Allocate a zeroed region for `capacity` bytes of text. State starts `Idle`.
    pub fn create(capacity: usize) -> Result<Self, ChannelError> {
        if capacity == 0 {
            return Err(ChannelError::InvalidCapacity { capacity });
        }
        let bytes = TEXT_OFFSET
            .checked_add(capacity)
            .ok_or(ChannelError::Allocation { bytes: usize::MAX })?;
        let layout = Layout::from_size_align(bytes, REGION_ALIGN)
            .map_err(|_| ChannelError::Allocation { bytes })?;

        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(ChannelError::Allocation { bytes })?;

        Ok(Self {
            ptr,
            capacity,
            owned: Some(layout),
            #[cfg(test)]
            transitions: std::sync::Mutex::default(),
        })
    }

    /// View an externally owned region with the same layout.
    ///
    /// The control word is forced to `Idle`; the text buffer is left as is.
    ///
    /// # Safety
    /// - `ptr` must point to at least `len` writable bytes
    /// - The region must outlive the returned channel
    /// - Nothing else may access the region except through another
    ///   `SharedChannel` following the same protocol
    pub unsafe fn from_raw(ptr: *mut u8, len: usize) -> Result<Self, ChannelError> {
        let ptr = NonNull::new(ptr).ok_or(ChannelError::NullRegion)?;
        if ptr.as_ptr() as usize % REGION_ALIGN != 0 {
            return Err(ChannelError::Misaligned { align: REGION_ALIGN });
        }
        let min = region_size(1);
        if len < min {
            return Err(ChannelError::RegionTooSmall { len, min });
        }

        let channel = Self {
            ptr,
            capacity: len - TEXT_OFFSET,
            owned: None,
            #[cfg(test)]
            transitions: std::sync::Mutex::default(),
        };
        channel.control().store(ChannelState::Idle as u32, Ordering::SeqCst);
        Ok(channel)
    }

    /// Text capacity in bytes (including room for the terminator).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total region length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        region_size(self.capacity)
    }

    /// Always false: a channel holds at least one text byte.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Raw pointer to the start of the region.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    // =========================================================================
    // CONTROL WORD
    // =========================================================================

    #[inline]
    fn control(&self) -> &AtomicU32 {
        // SAFETY: offset 0 is 4-byte aligned (checked at construction) and
        // lives as long as `self`.
        unsafe { &*(self.ptr.as_ptr().add(H_CONTROL) as *const AtomicU32) }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> ChannelState {
        ChannelState::from(self.control().load(Ordering::SeqCst))
    }

    /// Move the control word from `from` to `to`.
    ///
    /// Only edges accepted by [`ChannelState::can_transition`] are attempted,
    /// and only if the word still holds `from`. On failure nothing is stored
    /// and the state that was found is returned.
    pub fn transition(&self, from: ChannelState, to: ChannelState) -> Result<(), ChannelState> {
        if !from.can_transition(to) {
            return Err(self.state());
        }
        self.control()
            .compare_exchange(from as u32, to as u32, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| self.record(from, to, false))
            .map_err(ChannelState::from)
    }

    /// Force `Idle` and release any parked waiter. Idempotent.
    pub fn reset(&self) {
        let previous = self.control().swap(ChannelState::Idle as u32, Ordering::SeqCst);
        self.record(ChannelState::from(previous), ChannelState::Idle, true);
        wake::wake_all(self.control());
    }

    /// Park until the state is no longer `expected`.
    pub fn wait_while(&self, expected: ChannelState) {
        wake::wait_while(self.control(), expected as u32);
    }

    /// Wake one thread parked in [`wait_while`](Self::wait_while).
    #[inline]
    pub fn notify_one(&self) {
        wake::wake_one(self.control());
    }

    #[cfg(test)]
    fn record(&self, from: ChannelState, to: ChannelState, forced: bool) {
        if let Ok(mut log) = self.transitions.lock() {
            log.push((from, to, forced));
        }
    }

    #[cfg(not(test))]
    #[inline(always)]
    fn record(&self, _from: ChannelState, _to: ChannelState, _forced: bool) {}

    /// Every control word move made through this channel, oldest first.
    #[cfg(test)]
    pub(crate) fn transition_log(&self) -> Vec<Transition> {
        self.transitions.lock().map(|log| log.clone()).unwrap_or_default()
    }

    // =========================================================================
    // TEXT BUFFER
    // =========================================================================

    #[inline]
    fn text_ptr(&self) -> *mut u8 {
        // SAFETY: region is TEXT_OFFSET + capacity bytes long.
        unsafe { self.ptr.as_ptr().add(TEXT_OFFSET) }
    }

    /// Zero the whole text buffer.
    pub fn clear(&self) {
        // SAFETY: text region is `capacity` bytes; see the Sync note above.
        unsafe { ptr::write_bytes(self.text_ptr(), 0, self.capacity) }
    }

    /// Write `text` as UTF-8, truncated to `capacity - 1` bytes.
    ///
    /// Truncation is silent and may split a multi-byte code point. The buffer
    /// is zeroed first so nothing from a longer earlier write survives.
    /// Returns the number of bytes stored.
    pub fn write_text(&self, text: &str) -> usize {
        let bytes = text.as_bytes();
        let n = bytes.len().min(self.capacity - 1);
        self.clear();
        // SAFETY: n < capacity; source and destination cannot overlap.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), self.text_ptr(), n) }
        n
    }

    /// Decode the text up to the first zero byte (or the end of the buffer).
    ///
    /// Malformed sequences (e.g. a code point split by truncation) decode as
    /// U+FFFD instead of failing.
    pub fn read_text(&self) -> String {
        // SAFETY: text region is `capacity` initialized bytes.
        let text =
            unsafe { std::slice::from_raw_parts(self.text_ptr() as *const u8, self.capacity) };
        let len = text.iter().position(|&b| b == 0).unwrap_or(self.capacity);
        String::from_utf8_lossy(&text[..len]).into_owned()
    }
}

impl Drop for SharedChannel {
    fn drop(&mut self) {
        if let Some(layout) = self.owned.take() {
            // SAFETY: allocated in `create` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) }
        }
    }
}

impl std::fmt::Debug for SharedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedChannel")
            .field("capacity", &self.capacity)
            .field("state", &self.state())
            .field("owned", &self.owned.is_some())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(H_CONTROL, 0);
        assert_eq!(TEXT_OFFSET, 4);
        assert_eq!(region_size(DEFAULT_CAPACITY), 8196);
        assert_eq!(H_CONTROL % 4, 0);
    }

    #[test]
    fn test_create_starts_idle() {
        let ch = SharedChannel::create(16).unwrap();
        assert_eq!(ch.state(), ChannelState::Idle);
        assert_eq!(ch.capacity(), 16);
        assert_eq!(ch.len(), 20);
        assert_eq!(ch.read_text(), "");
    }

    #[test]
    fn test_create_rejects_zero_capacity() {
        let err = SharedChannel::create(0).unwrap_err();
        assert_eq!(err, ChannelError::InvalidCapacity { capacity: 0 });
        assert!(err.is_allocation());
    }

    #[test]
    fn test_create_rejects_unrepresentable_size() {
        let err = SharedChannel::create(usize::MAX).unwrap_err();
        assert!(matches!(err, ChannelError::Allocation { .. }));
    }

    #[test]
    fn test_transition_follows_lifecycle() {
        let ch = SharedChannel::create(8).unwrap();
        assert_eq!(ch.transition(ChannelState::Idle, ChannelState::Waiting), Ok(()));
        assert_eq!(ch.transition(ChannelState::Waiting, ChannelState::Ready), Ok(()));
        assert_eq!(ch.transition(ChannelState::Ready, ChannelState::Idle), Ok(()));
        assert_eq!(ch.state(), ChannelState::Idle);
        assert_eq!(
            ch.transition_log(),
            vec![
                (ChannelState::Idle, ChannelState::Waiting, false),
                (ChannelState::Waiting, ChannelState::Ready, false),
                (ChannelState::Ready, ChannelState::Idle, false),
            ]
        );
    }

    #[test]
    fn test_transition_rejects_edges_outside_lifecycle() {
        let ch = SharedChannel::create(8).unwrap();
        assert_eq!(
            ch.transition(ChannelState::Idle, ChannelState::Ready),
            Err(ChannelState::Idle)
        );
        ch.transition(ChannelState::Idle, ChannelState::Waiting).unwrap();
        assert_eq!(
            ch.transition(ChannelState::Waiting, ChannelState::Idle),
            Err(ChannelState::Waiting)
        );
        assert_eq!(ch.state(), ChannelState::Waiting);
    }

    #[test]
    fn test_transition_requires_current_state() {
        let ch = SharedChannel::create(8).unwrap();
        assert_eq!(
            ch.transition(ChannelState::Waiting, ChannelState::Ready),
            Err(ChannelState::Idle)
        );
        ch.transition(ChannelState::Idle, ChannelState::Waiting).unwrap();
        assert_eq!(
            ch.transition(ChannelState::Idle, ChannelState::Waiting),
            Err(ChannelState::Waiting)
        );
        assert!(ch.transition_log().iter().all(|&(from, to, _)| from.can_transition(to)));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let ch = SharedChannel::create(8).unwrap();
        ch.transition(ChannelState::Idle, ChannelState::Waiting).unwrap();
        ch.transition(ChannelState::Waiting, ChannelState::Ready).unwrap();
        ch.reset();
        assert_eq!(ch.state(), ChannelState::Idle);
        ch.reset();
        assert_eq!(ch.state(), ChannelState::Idle);
        assert_eq!(
            ch.transition_log()[2..],
            [
                (ChannelState::Ready, ChannelState::Idle, true),
                (ChannelState::Idle, ChannelState::Idle, true),
            ]
        );
    }

    #[test]
    fn test_truncation_exact_boundary() {
        let ch = SharedChannel::create(6).unwrap();
        assert_eq!(ch.write_text("hello"), 5);
        assert_eq!(ch.read_text(), "hello");
        assert_eq!(ch.write_text("hello!"), 5);
        assert_eq!(ch.read_text(), "hello");
    }

    #[test]
    fn test_truncation_splits_code_point() {
        // "aé" is 3 bytes; capacity 3 keeps 2 bytes: 'a' + first byte of 'é'.
        let ch = SharedChannel::create(3).unwrap();
        assert_eq!(ch.write_text("aé"), 2);
        assert_eq!(ch.read_text(), "a\u{FFFD}");
    }

    #[test]
    fn test_no_residue_after_shorter_write() {
        let ch = SharedChannel::create(64).unwrap();
        ch.write_text("a much longer previous answer");
        ch.write_text("ok");
        assert_eq!(ch.read_text(), "ok");

        // Nothing past the terminator either.
        let raw = unsafe { std::slice::from_raw_parts(ch.as_ptr().add(TEXT_OFFSET), 64) };
        assert!(raw[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_capacity_one_holds_only_terminator() {
        let ch = SharedChannel::create(1).unwrap();
        assert_eq!(ch.write_text("x"), 0);
        assert_eq!(ch.read_text(), "");
    }

    #[test]
    fn test_clear_zeroes_buffer() {
        let ch = SharedChannel::create(8).unwrap();
        ch.write_text("abc");
        ch.clear();
        assert_eq!(ch.read_text(), "");
    }

    #[test]
    fn test_from_raw_uses_same_layout() {
        let mut backing = vec![0u32; 4]; // 16 bytes: control + 12 text bytes
        backing[0] = ChannelState::Ready as u32;
        let ptr = backing.as_mut_ptr() as *mut u8;

        let ch = unsafe { SharedChannel::from_raw(ptr, 16) }.unwrap();
        assert_eq!(ch.capacity(), 12);
        assert_eq!(ch.state(), ChannelState::Idle);

        ch.transition(ChannelState::Idle, ChannelState::Waiting).unwrap();
        ch.write_text("hi");
        drop(ch);

        assert_eq!(backing[0], 1);
        let bytes = backing[1].to_ne_bytes();
        assert_eq!(&bytes[..3], b"hi\0");
    }

    #[test]
    fn test_from_raw_rejects_bad_regions() {
        assert_eq!(
            unsafe { SharedChannel::from_raw(ptr::null_mut(), 16) }.unwrap_err(),
            ChannelError::NullRegion
        );

        let mut backing = vec![0u32; 4];
        let base = backing.as_mut_ptr() as *mut u8;
        assert_eq!(
            unsafe { SharedChannel::from_raw(base.wrapping_add(1), 8) }.unwrap_err(),
            ChannelError::Misaligned { align: 4 }
        );
        assert_eq!(
            unsafe { SharedChannel::from_raw(base, 4) }.unwrap_err(),
            ChannelError::RegionTooSmall { len: 4, min: 5 }
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip_below_capacity(s in "[^\u{0}]{0,40}") {
            let ch = SharedChannel::create(s.len() + 1).unwrap();
            ch.write_text(&s);
            prop_assert_eq!(ch.read_text(), s);
        }

        #[test]
        fn prop_truncates_to_capacity_minus_one(s in "[a-z0-9 ]{8,64}", capacity in 1usize..8) {
            let ch = SharedChannel::create(capacity).unwrap();
            prop_assert_eq!(ch.write_text(&s), capacity - 1);
            prop_assert_eq!(ch.read_text(), &s[..capacity - 1]);
        }

        #[test]
        fn prop_truncated_text_is_lossy_prefix(s in "[^\u{0}]{1,24}", capacity in 1usize..32) {
            let ch = SharedChannel::create(capacity).unwrap();
            let written = ch.write_text(&s);
            let expected = String::from_utf8_lossy(&s.as_bytes()[..written]).into_owned();
            prop_assert_eq!(ch.read_text(), expected);
        }
    }
}
