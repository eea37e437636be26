use nettu_reminders_api::Application;
use nettu_reminders_infra::{setup_context, Config, NettuContext};

pub struct TestApp {
    pub config: Config,
    pub ctx: NettuContext,
    pub address: String,
}

// Launch the application as a background task
pub async fn spawn_app_with<F>(customize: F) -> TestApp
where
    F: FnOnce(&mut NettuContext),
{
    let mut ctx = setup_context().await;
    ctx.config.port = 0; // Random port
    customize(&mut ctx);

    let config = ctx.config.clone();
    let application = Application::new(ctx.clone())
        .await
        .expect("Failed to build application.");

    let address = format!("http://localhost:{}", application.port());
    let _ = actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    TestApp {
        config,
        ctx,
        address,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}
