fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(feature = "gui")]
    {
        use adw::prelude::*;

        let app = adw::Application::builder()
            .application_id("com.coachdesk.Coachdesk")
            .build();
        app.connect_activate(coachdesk::app::build_ui);
        app.run();
    }

    #[cfg(not(feature = "gui"))]
    {
        use clap::Parser;

        let cli = headless::Cli::parse();
        let config = match coachdesk::app::AppConfig::load() {
            Ok(cfg) => cfg,
            Err(err) => {
                log::error!("Failed to load configuration: {err}");
                std::process::exit(1);
            }
        };
        if let Err(err) = headless::run(cli, config) {
            log::error!("{err}");
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "gui"))]
mod headless;
