use ash::vk::PresentModeKHR;

use std::{
    thread::sleep,
    time::{ Duration, Instant },
};

/// Measures the time between consecutive frames.
pub struct FrameClock
{
    last: Instant,
}

impl FrameClock
{
    pub fn new() -> Self
    {
        Self { last: Instant::now() }
    }

    /// Seconds since the previous tick (or since creation).
    pub fn tick(&mut self) -> f32
    {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f32
    {
        let delta = now.saturating_duration_since(self.last);
        self.last = now;
        delta.as_secs_f32()
    }
}

impl Default for FrameClock
{
    fn default() -> Self { Self::new() }
}

/// Caps the frame rate when presentation is not already synced to vblank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacer
{
    target: Option<Duration>,
}

impl FramePacer
{
    pub fn from_fps(fps: u32) -> Self
    {
        let target = (fps > 0).then(|| Duration::from_secs_f64(1.0 / fps as f64));
        Self { target }
    }

    pub fn unpaced() -> Self { Self { target: None } }

    /// FIFO presentation already waits for vblank, so only the other modes
    /// get a cap.
    pub fn for_present_mode(present_mode: PresentModeKHR, fps: u32) -> Self
    {
        if present_mode == PresentModeKHR::FIFO {
            Self::unpaced()
        } else {
            Self::from_fps(fps)
        }
    }

    /// How long to wait after a frame that took `elapsed`.
    pub fn remaining(&self, elapsed: Duration) -> Duration
    {
        self.target
            .map(|target| target.saturating_sub(elapsed))
            .unwrap_or(Duration::ZERO)
    }

    /// Sleeps out whatever is left of the frame that began at `start`.
    pub fn pace(&self, start: Instant)
    {
        let remaining = self.remaining(start.elapsed());
        if !remaining.is_zero() {
            sleep(remaining);
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn zero_fps_disables_pacing()
    {
        let pacer = FramePacer::from_fps(0);
        assert_eq!(pacer, FramePacer::unpaced());
        assert_eq!(pacer.remaining(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn remaining_time_fills_the_frame()
    {
        let pacer = FramePacer::from_fps(50);
        assert_eq!(pacer.remaining(Duration::ZERO), Duration::from_millis(20));
        assert_eq!(pacer.remaining(Duration::from_millis(5)), Duration::from_millis(15));
    }

    #[test]
    fn vsync_presentation_is_never_paced()
    {
        assert_eq!(FramePacer::for_present_mode(PresentModeKHR::FIFO, 60), FramePacer::unpaced());
        assert_eq!(FramePacer::for_present_mode(PresentModeKHR::FIFO, 0), FramePacer::unpaced());
    }

    #[test]
    fn immediate_presentation_follows_target_fps()
    {
        assert_eq!(FramePacer::for_present_mode(PresentModeKHR::IMMEDIATE, 60), FramePacer::from_fps(60));
        assert_eq!(
            FramePacer::for_present_mode(PresentModeKHR::IMMEDIATE, 50).remaining(Duration::from_millis(5)),
            Duration::from_millis(15)
        );
        assert_eq!(FramePacer::for_present_mode(PresentModeKHR::IMMEDIATE, 0), FramePacer::unpaced());
    }

    #[test]
    fn slow_frames_never_underflow()
    {
        let pacer = FramePacer::from_fps(60);
        assert_eq!(pacer.remaining(Duration::from_millis(100)), Duration::ZERO);
    }

    #[test]
    fn clock_reports_delta_between_ticks()
    {
        let mut clock = FrameClock::new();
        let start = clock.last;

        let delta = clock.tick_at(start + Duration::from_millis(250));
        assert!((delta - 0.25).abs() < 1e-6);

        let delta = clock.tick_at(start + Duration::from_millis(250));
        assert_eq!(delta, 0.0);
    }
}
