#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{debug, info};
use sessionvault::{
    configure_services, session::SessionTimeouts, settings::SessionVaultSettings, CookieFactory,
    SessionManager,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = SessionVaultSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    start_server(settings).await
}

/// Start the server with an in-memory session cache
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(settings: SessionVaultSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let session_manager = web::Data::new(SessionManager::from_settings(&settings.session));
    let cookie_factory = web::Data::new(CookieFactory::new(settings.cookies.clone()));

    let purge_task = settings.session.purge_interval().map(|interval| {
        let manager = session_manager.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = manager.purge_expired();
                debug!("Session sweep removed {purged} expired session(s)");
            }
        })
    });

    let application = settings.application.clone();
    let server_manager = session_manager.clone();
    let result = HttpServer::new(move || {
        let application = application.clone();
        App::new()
            .app_data(server_manager.clone())
            .app_data(cookie_factory.clone())
            .wrap(Logger::default())
            .configure(move |cfg| configure_services(cfg, &application))
    })
    .bind(&bind_address)?
    .run()
    .await;

    if let Some(task) = purge_task {
        task.abort();
    }
    let cancelled = session_manager.shutdown();
    info!("Shut down with {cancelled} pending session cleanup(s) cancelled");
    result
}

fn print_startup_info(bind_address: &str, settings: &SessionVaultSettings) {
    let timeouts: SessionTimeouts = settings.session.timeouts();
    println!("Starting Sessionvault on http://{bind_address}");
    println!("Session Backend: in-memory cache");
    println!(
        "  Capacity: {}",
        if settings.session.max_cache_size < 0 {
            "unbounded".to_string()
        } else {
            settings.session.max_cache_size.to_string()
        }
    );
    match timeouts.session_expiry {
        Some(expiry) => println!("  Idle expiry: {}s", expiry.num_seconds()),
        None => println!("  Idle expiry: never"),
    }
    println!("  ID rotation: every {}s", timeouts.id_expiry.num_seconds());
    println!("  ID grace period: {}s", timeouts.id_grace_period.num_seconds());
    println!();
    println!("Session endpoints:");
    println!("  GET  /auth/session  - Session status (creates a session)");
    println!("  GET  /auth/user     - Authenticated user or 401");
    println!("  POST /auth/sign_out - End the session and clear the cookie");
    if settings.application.dev_sign_in {
        println!("  POST /auth/sign_in  - Development sign-in (binds any user id)");
    }
    println!();
    println!("System endpoints:");
    println!("  GET  /ping          - Health check");
}
