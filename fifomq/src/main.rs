use env_logger::Builder;
use fifomq::error::Result;
use fifomq::queue::manager::QueueManager;
use fifomq::{config, Context};
use log::info;
use std::io::Write;
use tokio::net::TcpListener;
use tokio::signal;

fn setup_logger() {
    let mut builder = Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    builder
        .format(|buf, record| {
            let lvl = buf.default_level_style(record.level()).bold();

            writeln!(
                buf,
                "{} - [{lvl}{:5}{lvl:#}] {}:{} - {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or_default(),
                record.line().unwrap_or_default(),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Always)
        .init();
}

#[tokio::main]
pub async fn main() -> Result<()> {
    let config = config::cli();

    setup_logger();

    #[cfg(feature = "tracing")]
    console_subscriber::init();

    let queue_manager = QueueManager::new();
    let context = Context {
        queue_manager: queue_manager.clone(),
    };

    let listener = TcpListener::bind(config.http_listen).await?;

    info!("Start HTTP queue API on {}", config.http_listen);

    tokio::select! {
        result = fifomq::serve(listener, context) => result?,
        result = signal::ctrl_c() => {
            result?;

            info!("Shutting down, {} queues dropped", queue_manager.queue_count());
        }
    }

    Ok(())
}
