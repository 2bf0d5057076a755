use sdl2::{
    EventPump,
    event::{ Event, WindowEvent },
};

use std::time::Instant;

use crate::{
    config::AppConfig,
    error::{ AppError, GpuError },
    frame::{ FrameClock, FramePacer },
    gpu::GpuDevice,
    window::Window,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl
{
    Continue,
    Quit,
}

/// A close request or any key press ends the loop.
pub fn should_quit(ev: &Event) -> bool
{
    matches!(ev, Event::Quit { .. } | Event::KeyDown { .. })
}

/// Window id of a size change, if `ev` is one.
pub fn resized_window(ev: &Event) -> Option<u32>
{
    match ev {
        Event::Window { window_id, win_event: WindowEvent::Resized(..), .. } |
        Event::Window { window_id, win_event: WindowEvent::SizeChanged(..), .. } => Some(*window_id),
        _ => None,
    }
}

/// Reacts to one event of the window `window_id`: quit requests end the
/// loop, size changes mark the swapchain for a rebuild.
pub fn handle_event(ev: &Event, window_id: u32, swapchain_stale: &mut bool) -> LoopControl
{
    if should_quit(ev) {
        return LoopControl::Quit;
    }

    if resized_window(ev) == Some(window_id) {
        *swapchain_stale = true;
    }

    LoopControl::Continue
}

pub struct Application
{
    // declared before `window` so the device is released first
    gpu: GpuDevice,
    window: Window,
    event_pump: EventPump,

    clock: FrameClock,
    pacer: FramePacer,
    swapchain_stale: bool,
}

impl Application
{
    pub fn new(config: AppConfig) -> Result<Self, AppError>
    {
        let window = Window::new(&config.window)?;
        let gpu = GpuDevice::claim(&window, &config.gpu)?;
        let event_pump = window.event_pump()?;

        let pacer = FramePacer::for_present_mode(gpu.present_mode(), config.frame.target_fps);

        let extent = gpu.swap_extent();
        log::info!("GPU device claimed: {} ({}x{})", gpu.device_name(), extent.width, extent.height);

        Ok(Self {
            gpu,
            window,
            event_pump,
            clock: FrameClock::new(),
            pacer,
            swapchain_stale: false,
        })
    }

    /// Runs until a quit request and returns the process exit status.
    pub fn run(&mut self) -> i32
    {
        match self.run_loop() {
            Ok(()) => 0,
            Err(err) => {
                log::error!("{}", err);
                1
            }
        }
    }

    fn run_loop(&mut self) -> Result<(), AppError>
    {
        log::info!("Entering main loop");

        'running: loop {
            let start_time = Instant::now();

            let window_id = self.window.id();
            for ev in self.event_pump.poll_iter() {
                if handle_event(&ev, window_id, &mut self.swapchain_stale) == LoopControl::Quit {
                    break 'running;
                }
            }

            if self.swapchain_stale && self.gpu.resize(&self.window)? {
                self.swapchain_stale = false;
            }

            let dt = self.clock.tick();
            self.update(dt);
            self.render()?;

            self.pacer.pace(start_time);
        }

        log::info!("Quit requested, shutting down");
        self.gpu.wait_idle()?;

        Ok(())
    }

    fn update(&mut self, _dt: f32)
    {
        // application state goes here
    }

    fn render(&mut self) -> Result<(), GpuError>
    {
        // TODO: acquire a swapchain image, record and submit a command buffer, present
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use sdl2::keyboard::{ Keycode, Mod, Scancode };

    fn key_down(keycode: Keycode) -> Event
    {
        Event::KeyDown {
            timestamp: 0,
            window_id: 1,
            keycode: Some(keycode),
            scancode: Some(Scancode::A),
            keymod: Mod::NOMOD,
            repeat: false,
        }
    }

    #[test]
    fn quit_and_any_key_end_the_loop()
    {
        assert!(should_quit(&Event::Quit { timestamp: 0 }));
        assert!(should_quit(&key_down(Keycode::A)));
        assert!(should_quit(&key_down(Keycode::Escape)));
    }

    #[test]
    fn other_events_are_ignored()
    {
        let key_up = Event::KeyUp {
            timestamp: 0,
            window_id: 1,
            keycode: Some(Keycode::A),
            scancode: Some(Scancode::A),
            keymod: Mod::NOMOD,
            repeat: false,
        };
        let motion = Event::MouseMotion {
            timestamp: 0,
            window_id: 1,
            which: 0,
            mousestate: sdl2::mouse::MouseState::from_sdl_state(0),
            x: 10,
            y: 10,
            xrel: 1,
            yrel: 1,
        };

        assert!(!should_quit(&key_up));
        assert!(!should_quit(&motion));
        assert_eq!(resized_window(&motion), None);
    }

    #[test]
    fn only_own_window_resizes_mark_the_swapchain()
    {
        let resized = |window_id| Event::Window {
            timestamp: 0,
            window_id,
            win_event: WindowEvent::Resized(640, 480),
        };

        let mut stale = false;
        assert_eq!(handle_event(&resized(2), 1, &mut stale), LoopControl::Continue);
        assert!(!stale);

        assert_eq!(handle_event(&resized(1), 1, &mut stale), LoopControl::Continue);
        assert!(stale);
    }

    #[test]
    fn quit_events_stop_without_touching_the_swapchain()
    {
        let mut stale = false;
        assert_eq!(handle_event(&Event::Quit { timestamp: 0 }, 1, &mut stale), LoopControl::Quit);
        assert_eq!(handle_event(&key_down(Keycode::Space), 1, &mut stale), LoopControl::Quit);
        assert!(!stale);
    }

    #[test]
    fn size_changes_report_their_window()
    {
        let resized = Event::Window {
            timestamp: 0,
            window_id: 3,
            win_event: WindowEvent::Resized(640, 480),
        };
        let size_changed = Event::Window {
            timestamp: 0,
            window_id: 4,
            win_event: WindowEvent::SizeChanged(640, 480),
        };
        let focus = Event::Window {
            timestamp: 0,
            window_id: 3,
            win_event: WindowEvent::FocusGained,
        };

        assert_eq!(resized_window(&resized), Some(3));
        assert_eq!(resized_window(&size_changed), Some(4));
        assert_eq!(resized_window(&focus), None);
        assert!(!should_quit(&resized));
    }
}
