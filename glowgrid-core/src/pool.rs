//! Bounded animation and frame pools.
//!
//! Two parallel ring buffers indexed by `(start, length)` cursors: one of
//! animation records, one of frames. The frames of each live animation form
//! a contiguous span in the frame ring, in animation order, with no gaps.
//! Slots are allocated at the tail and only ever released from the head, so
//! retiring an animation is two cursor advances.

use crate::frame::Frame;
use crate::{cant_happen, Fault};

/// Animation slots in the ring.
pub const MAX_ANIMATIONS: usize = 32;
/// Frame slots in the ring.
pub const MAX_FRAMES: usize = 16;

/// One queued animation: a span of frames plus playback bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Animation {
    /// Still accepting frames; only ever true on the tail animation.
    pub being_loaded: bool,
    /// Playback has begun; set by the player on first display.
    pub started: bool,
    /// Index of the first owned frame in the frame ring.
    pub frame_start: usize,
    /// Owned frame count; the span wraps modulo [`MAX_FRAMES`].
    pub num_frames: usize,
    /// Total display time before the animation retires.
    pub duration_ms: u32,
}

/// The paired rings and their cursors.
pub struct AnimationPool {
    frames: [Frame; MAX_FRAMES],
    animations: [Animation; MAX_ANIMATIONS],
    frames_start: usize,
    frames_len: usize,
    animations_start: usize,
    animations_len: usize,
}

impl AnimationPool {
    pub fn new() -> Self {
        const EMPTY: Frame = Frame::new();
        Self {
            frames: [EMPTY; MAX_FRAMES],
            animations: [Animation::default(); MAX_ANIMATIONS],
            frames_start: 0,
            frames_len: 0,
            animations_start: 0,
            animations_len: 0,
        }
    }

    /// True when both rings have slack for a new animation.
    pub fn can_load_animation(&self) -> bool {
        self.animations_len < MAX_ANIMATIONS && self.can_load_frame()
    }

    pub fn can_load_frame(&self) -> bool {
        self.frames_len < MAX_FRAMES
    }

    /// Allocate a tail animation marked loading, sealing any previous
    /// loading animation first. Returns false when either ring is full.
    pub fn start_loading(&mut self, duration_ms: u32) -> bool {
        if !self.can_load_animation() {
            return false;
        }
        if self.animations_len > 0 {
            self.finalize_loading();
        }
        let idx = (self.animations_start + self.animations_len) % MAX_ANIMATIONS;
        self.animations[idx] = Animation {
            being_loaded: true,
            started: false,
            frame_start: (self.frames_start + self.frames_len) % MAX_FRAMES,
            num_frames: 0,
            duration_ms,
        };
        self.animations_len += 1;
        true
    }

    /// True iff the tail animation is still accepting frames.
    pub fn is_loading_animation(&self) -> bool {
        self.tail().is_some_and(|anim| anim.being_loaded)
    }

    /// Seal the tail animation. Idempotent.
    pub fn finalize_loading(&mut self) {
        if let Some(tail) = self.tail_mut() {
            tail.being_loaded = false;
        }
    }

    /// Allocate the next frame slot for the loading animation.
    ///
    /// The slot is rewound and the tail animation's span grows by one.
    /// Returns the frame ring index, or `None` when the frame ring is full
    /// or no animation is loading.
    pub fn frame_to_load(&mut self) -> Option<usize> {
        if !self.can_load_frame() || !self.is_loading_animation() {
            return None;
        }
        let idx = (self.frames_start + self.frames_len) % MAX_FRAMES;
        self.frames_len += 1;
        self.frames[idx].rewind();
        match self.tail_mut() {
            Some(tail) => tail.num_frames += 1,
            None => cant_happen(Fault::FrameSlotWithoutAnimation),
        }
        Some(idx)
    }

    /// Retire the head animation and release its frame span.
    pub fn retire_head(&mut self) {
        let Some(head) = self.head().copied() else {
            cant_happen(Fault::RetireWithoutHead);
            return;
        };
        if head.num_frames > self.frames_len {
            cant_happen(Fault::FrameSpanExceedsRing);
            self.reset();
            return;
        }
        self.frames_start = (self.frames_start + head.num_frames) % MAX_FRAMES;
        self.frames_len -= head.num_frames;
        self.animations_start = (self.animations_start + 1) % MAX_ANIMATIONS;
        self.animations_len -= 1;
    }

    /// Drop head animations that were sealed with no frames. A legal upload
    /// pattern; the player must not stall on them.
    pub fn discard_empty_sealed_heads(&mut self) {
        while let Some(head) = self.head() {
            if head.num_frames == 0 && !head.being_loaded {
                self.animations_start = (self.animations_start + 1) % MAX_ANIMATIONS;
                self.animations_len -= 1;
            } else {
                break;
            }
        }
    }

    /// Retire the head so the next animation plays. No-op with fewer than
    /// two live animations.
    pub fn skip_current(&mut self) {
        if self.animations_len < 2 {
            return;
        }
        self.retire_head();
    }

    /// Zero all cursors, releasing every slot.
    pub fn reset(&mut self) {
        self.frames_start = 0;
        self.frames_len = 0;
        self.animations_start = 0;
        self.animations_len = 0;
    }

    pub fn head(&self) -> Option<&Animation> {
        (self.animations_len > 0).then(|| &self.animations[self.animations_start])
    }

    pub fn head_mut(&mut self) -> Option<&mut Animation> {
        (self.animations_len > 0).then(|| &mut self.animations[self.animations_start])
    }

    pub fn tail(&self) -> Option<&Animation> {
        (self.animations_len > 0).then(|| {
            &self.animations[(self.animations_start + self.animations_len - 1) % MAX_ANIMATIONS]
        })
    }

    fn tail_mut(&mut self) -> Option<&mut Animation> {
        (self.animations_len > 0).then(|| {
            &mut self.animations[(self.animations_start + self.animations_len - 1) % MAX_ANIMATIONS]
        })
    }

    /// Live animations in queue order, head first.
    pub fn live_animations(&self) -> impl Iterator<Item = &Animation> {
        (0..self.animations_len)
            .map(move |i| &self.animations[(self.animations_start + i) % MAX_ANIMATIONS])
    }

    pub fn frame(&self, idx: usize) -> &Frame {
        &self.frames[idx % MAX_FRAMES]
    }

    pub fn frame_mut(&mut self, idx: usize) -> &mut Frame {
        &mut self.frames[idx % MAX_FRAMES]
    }

    pub fn free_animation_slots(&self) -> usize {
        MAX_ANIMATIONS - self.animations_len
    }

    pub fn free_frame_slots(&self) -> usize {
        MAX_FRAMES - self.frames_len
    }

    pub fn animations_len(&self) -> usize {
        self.animations_len
    }

    pub fn animations_start(&self) -> usize {
        self.animations_start
    }

    pub fn frames_len(&self) -> usize {
        self.frames_len
    }

    pub fn frames_start(&self) -> usize {
        self.frames_start
    }
}

impl Default for AnimationPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The union of live animation spans must exactly cover the live frame
    /// region.
    fn assert_spans_contiguous(pool: &AnimationPool) {
        let total: usize = pool.live_animations().map(|a| a.num_frames).sum();
        assert_eq!(total, pool.frames_len());
        let mut expected = pool.frames_start();
        for anim in pool.live_animations() {
            assert_eq!(anim.frame_start, expected);
            expected = (expected + anim.num_frames) % MAX_FRAMES;
        }
    }

    fn load_animation(pool: &mut AnimationPool, duration_ms: u32, frames: usize) {
        assert!(pool.start_loading(duration_ms));
        for _ in 0..frames {
            pool.frame_to_load().unwrap();
        }
        pool.finalize_loading();
    }

    #[test]
    fn test_empty_pool() {
        let pool = AnimationPool::new();
        assert!(pool.can_load_animation());
        assert!(pool.head().is_none());
        assert_eq!(pool.free_animation_slots(), MAX_ANIMATIONS);
        assert_eq!(pool.free_frame_slots(), MAX_FRAMES);
    }

    #[test]
    fn test_start_loading_seals_previous() {
        let mut pool = AnimationPool::new();
        load_animation(&mut pool, 1000, 2);
        assert!(pool.start_loading(2000));
        assert!(pool.is_loading_animation());
        // Only the tail may be loading.
        assert!(!pool.head().unwrap().being_loaded);
        assert_eq!(
            pool.live_animations().filter(|a| a.being_loaded).count(),
            1
        );
        assert_spans_contiguous(&pool);
    }

    #[test]
    fn test_implicit_seal_without_done() {
        let mut pool = AnimationPool::new();
        assert!(pool.start_loading(1000));
        pool.frame_to_load().unwrap();
        // Second ANM seals the first even though DON never arrived.
        assert!(pool.start_loading(2000));
        let head = pool.head().unwrap();
        assert!(!head.being_loaded);
        assert_eq!(head.num_frames, 1);
    }

    #[test]
    fn test_animation_ring_fills() {
        let mut pool = AnimationPool::new();
        for i in 0..MAX_ANIMATIONS {
            assert!(pool.start_loading(i as u32), "slot {i} should fit");
        }
        assert!(!pool.can_load_animation());
        assert!(!pool.start_loading(99));
        assert_eq!(pool.free_animation_slots(), 0);
    }

    #[test]
    fn test_frame_ring_fills() {
        let mut pool = AnimationPool::new();
        assert!(pool.start_loading(1000));
        for _ in 0..MAX_FRAMES {
            assert!(pool.frame_to_load().is_some());
        }
        assert!(pool.frame_to_load().is_none());
        // A full frame ring also blocks new animations.
        assert!(!pool.can_load_animation());
    }

    #[test]
    fn test_frame_without_loading_animation() {
        let mut pool = AnimationPool::new();
        assert!(pool.frame_to_load().is_none());
        load_animation(&mut pool, 1000, 1);
        // Sealed: no longer accepting frames.
        assert!(pool.frame_to_load().is_none());
    }

    #[test]
    fn test_retire_head_releases_span() {
        let mut pool = AnimationPool::new();
        load_animation(&mut pool, 1000, 3);
        load_animation(&mut pool, 2000, 2);
        assert_eq!(pool.frames_len(), 5);

        pool.retire_head();
        assert_eq!(pool.animations_len(), 1);
        assert_eq!(pool.frames_len(), 2);
        assert_eq!(pool.head().unwrap().duration_ms, 2000);
        assert_spans_contiguous(&pool);
    }

    #[test]
    fn test_ring_wraps_after_retirement() {
        let mut pool = AnimationPool::new();
        load_animation(&mut pool, 1000, 10);
        pool.retire_head();
        // 10 slots are free again but the tail has moved; the next span
        // wraps around the ring end.
        load_animation(&mut pool, 2000, 12);
        assert_eq!(pool.frames_len(), 12);
        assert_eq!(pool.head().unwrap().frame_start, 10);
        assert_spans_contiguous(&pool);
    }

    #[test]
    fn test_skip_requires_two() {
        let mut pool = AnimationPool::new();
        load_animation(&mut pool, 1000, 1);
        pool.skip_current();
        assert_eq!(pool.animations_len(), 1);

        load_animation(&mut pool, 2000, 1);
        pool.skip_current();
        assert_eq!(pool.animations_len(), 1);
        assert_eq!(pool.head().unwrap().duration_ms, 2000);
        assert_spans_contiguous(&pool);
    }

    #[test]
    fn test_discard_empty_sealed_heads() {
        let mut pool = AnimationPool::new();
        load_animation(&mut pool, 1000, 0);
        load_animation(&mut pool, 2000, 0);
        load_animation(&mut pool, 3000, 1);
        pool.discard_empty_sealed_heads();
        assert_eq!(pool.animations_len(), 1);
        assert_eq!(pool.head().unwrap().duration_ms, 3000);
    }

    #[test]
    fn test_discard_keeps_loading_head() {
        let mut pool = AnimationPool::new();
        assert!(pool.start_loading(1000));
        pool.discard_empty_sealed_heads();
        // Still loading: zero frames so far, but not discardable.
        assert_eq!(pool.animations_len(), 1);
    }

    #[test]
    fn test_reset() {
        let mut pool = AnimationPool::new();
        load_animation(&mut pool, 1000, 4);
        pool.reset();
        assert_eq!(pool.animations_len(), 0);
        assert_eq!(pool.frames_len(), 0);
        assert_eq!(pool.free_frame_slots(), MAX_FRAMES);
    }

    #[test]
    fn test_frame_to_load_rewinds_slot() {
        let mut pool = AnimationPool::new();
        load_animation(&mut pool, 1000, 1);
        {
            let frame = pool.frame_mut(0);
            let mut row = heapless::String::<96>::new();
            for _ in 0..16 {
                row.push_str("FFFFFF").unwrap();
            }
            frame.load_hex(&row).unwrap();
            assert_eq!(frame.row_being_loaded(), 1);
        }
        pool.retire_head();
        assert!(pool.start_loading(500));
        let idx = pool.frame_to_load().unwrap();
        assert_eq!(idx, 1);
        // Wrap far enough to reuse slot 0 and confirm it is rewound.
        for _ in 0..MAX_FRAMES - 1 {
            pool.frame_to_load().unwrap();
        }
        assert_eq!(pool.frame(0).row_being_loaded(), 0);
    }
}
