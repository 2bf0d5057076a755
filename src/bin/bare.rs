//! Minimal variant: window, GPU device and a polling loop, no application layer.

use sdl_gpu_starter::{
    application::should_quit,
    config::AppConfig,
    error::AppError,
    gpu::GpuDevice,
    window::Window,
};

fn main()
{
    sdl_gpu_starter::init_logging();

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError>
{
    let config = AppConfig::default();

    let window = Window::new(&config.window)?;
    let gpu = GpuDevice::claim(&window, &config.gpu)?;
    let mut event_pump = window.event_pump()?;

    let mut quit = false;
    while !quit {
        for ev in event_pump.poll_iter() {
            if should_quit(&ev) {
                quit = true;
            }
        }

        // state update goes here

        // TODO: acquire a swapchain image, record and submit a command buffer, present
    }

    gpu.wait_idle()?;

    // device before window, window (and SDL) last
    drop(gpu);
    drop(window);

    Ok(())
}
