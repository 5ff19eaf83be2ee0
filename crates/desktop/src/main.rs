mod app;
mod settings;
mod theme;
mod widgets;

use facecam_core::detection::infrastructure::cascade_resolver;
use facecam_core::pipeline::session_factory::SessionFactory;
use facecam_core::shared::constants::CASCADE_FILE_NAME;

use app::App;

fn main() -> iced::Result {
    env_logger::init();

    // Detection cannot run without the cascade, so refuse to start.
    let factory = match load_session_factory() {
        Ok(factory) => factory,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    iced::application(move || App::new(&factory), App::update, App::view)
        .title("Face Detection Pro")
        .theme(App::theme)
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(900.0, 700.0),
            ..Default::default()
        })
        .run()
}

fn load_session_factory() -> Result<SessionFactory, Box<dyn std::error::Error>> {
    let path = cascade_resolver::resolve(CASCADE_FILE_NAME)?;
    log::info!("Using cascade {}", path.display());
    SessionFactory::new(&path)
}
