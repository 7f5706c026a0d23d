use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use driftwatch_state_center::ReconciledView;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::info;

use super::context::CliContext;
use super::output::{emit, render_view};
use crate::app_context::Monitor;

#[derive(Args, Clone, Debug)]
pub struct WatchArgs {
    /// Stop after this many seconds (runs until Ctrl-C otherwise)
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Print the current view every SECS seconds instead of on every change
    #[arg(long, value_name = "SECS")]
    pub once_per: Option<u64>,
}

pub async fn cmd_watch(args: WatchArgs, ctx: &CliContext) -> Result<()> {
    let monitor = Monitor::new(ctx.config().clone()).context("failed to build monitor")?;
    monitor.start();
    info!(
        backend = %ctx.config().backend_url(),
        duration = ?args.duration,
        "watching"
    );

    let deadline = args
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let result = follow(&monitor, &args, ctx, deadline).await;
    monitor.stop().await;
    result
}

async fn follow(
    monitor: &Monitor,
    args: &WatchArgs,
    ctx: &CliContext,
    deadline: Option<Instant>,
) -> Result<()> {
    let until_deadline = async {
        match deadline {
            Some(at) => sleep_until(at).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(until_deadline);

    let mut views = monitor.watch_view();
    let mut ticker = args.once_per.map(|secs| {
        let mut ticker = interval(Duration::from_secs(secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });

    loop {
        tokio::select! {
            _ = &mut until_deadline => return Ok(()),
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                return Ok(());
            }
            changed = views.changed(), if ticker.is_none() => {
                if changed.is_err() {
                    return Ok(());
                }
                let view = views.borrow_and_update().clone();
                print_view(ctx, &view)?;
            }
            _ = async {
                match ticker.as_mut() {
                    Some(ticker) => { ticker.tick().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {
                print_view(ctx, &monitor.view())?;
            }
        }
    }
}

fn print_view(ctx: &CliContext, view: &ReconciledView) -> Result<()> {
    emit(ctx.output(), view, |view| format!("{}\n", render_view(view)))
}
