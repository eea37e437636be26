use crate::{
    notification::DispatchScheduledNotificationsUseCase, shared::usecase::execute,
};
use actix_web::rt::time::interval;
use nettu_reminders_infra::NettuContext;
use std::time::Duration;
use tracing::info;

/// Starts `config.dispatch_workers` independent dispatcher loops.
///
/// A failing dispatch is logged by the use case executor and the loop
/// simply tries again on the next tick.
pub fn start_dispatch_job(ctx: NettuContext) {
    let workers = std::cmp::max(ctx.config.dispatch_workers, 1);
    let poll_interval = Duration::from_millis(std::cmp::max(ctx.config.dispatch_poll_interval_millis, 1) as u64);

    for worker in 0..workers {
        let ctx = ctx.clone();
        actix_web::rt::spawn(async move {
            let mut interval = interval(poll_interval);
            loop {
                interval.tick().await;

                let usecase = DispatchScheduledNotificationsUseCase {};
                if let Ok(report) = execute(usecase, &ctx).await {
                    if !report.is_empty() {
                        info!("Dispatcher {} finished: {:?}", worker, report);
                    }
                }
            }
        });
    }
}
