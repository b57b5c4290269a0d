//! Time-driven playback over the animation pool.
//!
//! Each tick the player retires whatever has expired, starts the head
//! animation if it has not run yet, advances frames within it, and hands
//! back the frame to display. When nothing is playable it returns its own
//! all-black sentinel, so the caller always has a frame.

use crate::frame::Frame;
use crate::pool::{AnimationPool, MAX_FRAMES};
use crate::time::{deadline_reached, remaining_ms};

/// Playback cursors plus the sentinel frame.
pub struct Player {
    sentinel: Frame,
    current_frame: usize,
    animation_deadline: u32,
    frame_deadline: u32,
}

impl Player {
    pub fn new() -> Self {
        Self {
            sentinel: Frame::new(),
            current_frame: 0,
            animation_deadline: 0,
            frame_deadline: 0,
        }
    }

    /// Select the frame to display at `now_ms`, advancing playback state.
    pub fn current_frame<'a>(
        &'a mut self,
        pool: &'a mut AnimationPool,
        now_ms: u32,
    ) -> &'a Frame {
        // Retire the head animation once its time is up.
        if let Some(head) = pool.head().copied() {
            if head.started && deadline_reached(now_ms, self.animation_deadline) {
                pool.retire_head();
            }
        }

        pool.discard_empty_sealed_heads();

        let Some(head) = pool.head().copied() else {
            return &self.sentinel;
        };
        // Never display an animation that is still being filled.
        if head.being_loaded {
            return &self.sentinel;
        }

        if !head.started {
            self.current_frame = head.frame_start;
            self.animation_deadline = now_ms.wrapping_add(head.duration_ms);
            self.frame_deadline =
                now_ms.wrapping_add(pool.frame(head.frame_start).duration_ms());
            if let Some(head) = pool.head_mut() {
                head.started = true;
            }
        }

        if deadline_reached(now_ms, self.frame_deadline) {
            let next = (self.current_frame + 1) % MAX_FRAMES;
            let span_end = (head.frame_start + head.num_frames) % MAX_FRAMES;
            self.current_frame = if next == span_end {
                head.frame_start
            } else {
                next
            };
            self.frame_deadline =
                now_ms.wrapping_add(pool.frame(self.current_frame).duration_ms());
        }

        pool.frame(self.current_frame)
    }

    /// Remaining display time of the started head animation.
    pub fn head_remaining_ms(&self, now_ms: u32) -> u32 {
        remaining_ms(now_ms, self.animation_deadline)
    }

    /// Index of the frame currently displayed, for diagnostics.
    pub fn current_frame_index(&self) -> usize {
        self.current_frame
    }

    /// Forget all playback cursors; used by the full reset.
    pub fn reset(&mut self) {
        self.current_frame = 0;
        self.animation_deadline = 0;
        self.frame_deadline = 0;
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_blank(frame: &Frame) -> bool {
        frame.pixels().iter().all(|&b| b == 0)
    }

    fn paint(pool: &mut AnimationPool, idx: usize, value: u8) {
        let frame = pool.frame_mut(idx);
        for y in 0..crate::frame::HEIGHT {
            for x in 0..crate::frame::WIDTH {
                frame.set_pixel(y, x, value, 0, 0);
            }
        }
    }

    /// One sealed animation: `frames` (duration, red value) pairs.
    fn enqueue(pool: &mut AnimationPool, duration_ms: u32, frames: &[(u32, u8)]) {
        assert!(pool.start_loading(duration_ms));
        for &(frame_ms, value) in frames {
            let idx = pool.frame_to_load().unwrap();
            pool.frame_mut(idx).set_duration_ms(frame_ms);
            paint(pool, idx, value);
        }
        pool.finalize_loading();
    }

    #[test]
    fn test_sentinel_when_empty() {
        let mut pool = AnimationPool::new();
        let mut player = Player::new();
        assert!(is_blank(player.current_frame(&mut pool, 0)));
    }

    #[test]
    fn test_sentinel_while_loading() {
        let mut pool = AnimationPool::new();
        let mut player = Player::new();
        pool.start_loading(1000);
        let idx = pool.frame_to_load().unwrap();
        paint(&mut pool, idx, 200);
        assert!(is_blank(player.current_frame(&mut pool, 0)));
        // Sealing makes it playable.
        pool.finalize_loading();
        let frame = player.current_frame(&mut pool, 0);
        assert_eq!(frame.pixel(0, 0).0, 200);
    }

    #[test]
    fn test_plays_then_expires() {
        let mut pool = AnimationPool::new();
        let mut player = Player::new();
        enqueue(&mut pool, 2000, &[(1000, 10)]);

        assert_eq!(player.current_frame(&mut pool, 0).pixel(0, 0).0, 10);
        assert_eq!(player.current_frame(&mut pool, 1999).pixel(0, 0).0, 10);
        // Past the duration the animation retires and the sentinel returns.
        assert!(is_blank(player.current_frame(&mut pool, 2000)));
        assert_eq!(pool.animations_len(), 0);
    }

    #[test]
    fn test_frames_advance_and_cycle() {
        let mut pool = AnimationPool::new();
        let mut player = Player::new();
        enqueue(&mut pool, 10_000, &[(100, 1), (100, 2)]);

        assert_eq!(player.current_frame(&mut pool, 0).pixel(0, 0).0, 1);
        assert_eq!(player.current_frame(&mut pool, 50).pixel(0, 0).0, 1);
        assert_eq!(player.current_frame(&mut pool, 100).pixel(0, 0).0, 2);
        // Cycles back while the animation duration lasts.
        assert_eq!(player.current_frame(&mut pool, 200).pixel(0, 0).0, 1);
        assert_eq!(player.current_frame(&mut pool, 300).pixel(0, 0).0, 2);
    }

    #[test]
    fn test_duration_truncates_frames() {
        let mut pool = AnimationPool::new();
        let mut player = Player::new();
        // Animation expires long before its only frame would.
        enqueue(&mut pool, 100, &[(60_000, 7)]);
        assert_eq!(player.current_frame(&mut pool, 0).pixel(0, 0).0, 7);
        assert!(is_blank(player.current_frame(&mut pool, 150)));
    }

    #[test]
    fn test_next_animation_after_expiry() {
        let mut pool = AnimationPool::new();
        let mut player = Player::new();
        enqueue(&mut pool, 1000, &[(500, 1)]);
        enqueue(&mut pool, 1000, &[(500, 2)]);

        assert_eq!(player.current_frame(&mut pool, 0).pixel(0, 0).0, 1);
        // Second animation starts on the tick after the first expires.
        assert_eq!(player.current_frame(&mut pool, 1000).pixel(0, 0).0, 2);
        assert_eq!(player.current_frame(&mut pool, 1999).pixel(0, 0).0, 2);
        assert!(is_blank(player.current_frame(&mut pool, 2100)));
    }

    #[test]
    fn test_skips_empty_sealed_animations() {
        let mut pool = AnimationPool::new();
        let mut player = Player::new();
        enqueue(&mut pool, 5000, &[]);
        enqueue(&mut pool, 5000, &[]);
        enqueue(&mut pool, 1000, &[(100, 9)]);
        assert_eq!(player.current_frame(&mut pool, 0).pixel(0, 0).0, 9);
    }

    #[test]
    fn test_playback_across_clock_wrap() {
        let mut pool = AnimationPool::new();
        let mut player = Player::new();
        enqueue(&mut pool, 1000, &[(100, 3)]);

        let start = u32::MAX - 500;
        assert_eq!(player.current_frame(&mut pool, start).pixel(0, 0).0, 3);
        // Clock wraps mid-animation; still playing.
        assert_eq!(player.current_frame(&mut pool, 300).pixel(0, 0).0, 3);
        // And expires at the wrapped deadline.
        assert!(is_blank(player.current_frame(&mut pool, 600)));
    }

    #[test]
    fn test_head_remaining() {
        let mut pool = AnimationPool::new();
        let mut player = Player::new();
        enqueue(&mut pool, 2000, &[(100, 1)]);
        player.current_frame(&mut pool, 500);
        assert_eq!(player.head_remaining_ms(1000), 1500);
    }
}
