use sdl_gpu_starter::{
    application::Application,
    cli::CliArgs,
    config::AppConfig,
    error::AppError,
};

fn main()
{
    let args = CliArgs::parse();
    sdl_gpu_starter::init_logging();

    match std::env::current_dir() {
        Ok(dir) => log::info!("Current working dir: {}", dir.display()),
        Err(err) => log::warn!("Current working dir unavailable: {}", err),
    }

    let code = match start(&args) {
        Ok(mut app) => app.run(),
        Err(err) => {
            log::error!("{}", err);
            1
        }
    };

    std::process::exit(code);
}

fn start(args: &CliArgs) -> Result<Application, AppError>
{
    let config = AppConfig::discover(args)?;
    Application::new(config)
}
