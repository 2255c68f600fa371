use appwatch::{
    cli::Cli,
    signals::{SignalEvent, wait_for_signal},
};
use clap::Parser;
use monitor::{
    ControlEvent, DefaultAppFilter, Monitor, ProcfsSource, ReloadBundle, Services,
    SqliteStore, SystemClock, reset_channel,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // NOTE: The verbosity flag sets the baseline level, `APPWATCH_LOG` can
    // only add per-crate directives on top of it. For example,
    // `APPWATCH_LOG=monitor=trace appwatch` traces the monitor crate while
    // everything else stays at the warn level.
    let env_filter = EnvFilter::builder()
        .with_default_directive("sqlx=warn".parse()?)
        .with_env_var("APPWATCH_LOG")
        .from_env()?
        .add_directive(cli.verbosity.log_level_filter().as_str().parse()?);

    let layer = tracing_subscriber::fmt::layer()
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();

    let config = cli.load_config()?;
    debug!(?config, ?cli);

    let store = SqliteStore::open(&config.persistence.database).await?;
    let (sink, writer_handle) = store.spawn_sink();
    info!(database = ?store.path(), "recording application usage");

    // install signal handlers
    let (signals_tx, signals_rx) = flume::bounded(8);
    let mut signal_handle = tokio::spawn(async move { wait_for_signal(signals_tx).await });

    let services = Services {
        source: Box::new(ProcfsSource),
        filter: Box::new(DefaultAppFilter::new(&config)),
        sink: Box::new(sink),
        store: Box::new(store.clone()),
        clock: Box::new(SystemClock),
    };
    let mut monitor = Monitor::new(config, services);

    let cancel = CancellationToken::new();
    // Resets only ever come bundled with a history clear, which travels on
    // the control channel so both happen between two ticks.
    let (_reset, reset_rx) = reset_channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let monitor_cancel = cancel.clone();
    let mut monitor_handle = tokio::spawn(async move {
        monitor.run_until(monitor_cancel, reset_rx, control_rx).await;
    });

    let monitor_exited = loop {
        tokio::select! {
            // bubble up any errors from the signal handlers
            res = &mut signal_handle => {
                let res = res?;
                if let Err(err) = &res {
                    error!("error happened during handling signals: {}", err);
                }
                res?;
                break false;
            }

            res = &mut monitor_handle => {
                res?;
                warn!("monitor stopped unexpectedly");
                break true;
            }

            event_res = signals_rx.recv_async() => {
                let event = event_res?;
                debug!(?event, "Received signal event");

                match event {
                    SignalEvent::DumpStatus => {
                        control_tx.send(ControlEvent::DumpStatus).ok();
                    }
                    SignalEvent::ReloadConfig => match cli.load_config() {
                        Ok(config) => {
                            let filter = Box::new(DefaultAppFilter::new(&config));
                            let bundle = Box::new(ReloadBundle { config, filter });
                            control_tx.send(ControlEvent::Reload(bundle)).ok();
                        }
                        Err(err) => {
                            error!(%err, "failed to reload config, keeping the current one");
                        }
                    },
                    SignalEvent::ClearHistory => {
                        control_tx.send(ControlEvent::ClearHistory).ok();
                    }
                    SignalEvent::Shutdown => break false,
                }
            }
        }
    };

    if !monitor_exited {
        cancel.cancel();
        monitor_handle.await?;
    }
    // The monitor owned the sink, the writer drains what is left and exits.
    writer_handle.await?;
    store.pool().close().await;
    debug!("shutdown complete");

    Ok(())
}
