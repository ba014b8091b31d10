//! Demo entry point: drives a sample order through an event-sourced
//! repository and prints the resulting metrics.

mod config;
mod order;

use eventsource::{
    BoxError, DomainError, DomainEvent, Event, EventStore, InMemoryEventStore, PostgresEventStore,
    Repository, Version,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::Config;
use order::{Order, OrderCommand, OrderEvent};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(config.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.log_json).then(tracing_subscriber::fmt::layer))
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    // 3. Pick a store and run the sample
    match &config.database_url {
        Some(url) => {
            tracing::info!("using PostgreSQL event store");
            let store = PostgresEventStore::connect(url).await?;
            store.run_migrations().await?;
            run(store, &config).await?;
        }
        None => {
            tracing::info!("using in-memory event store");
            run(InMemoryEventStore::new(), &config).await?;
        }
    }

    println!("{}", metrics_handle.render());
    Ok(())
}

/// Places, fills and ships one order, then rebuilds it from its history.
async fn run<S: EventStore>(store: S, config: &Config) -> Result<Version, DomainError> {
    let repository = Repository::<Order>::builder()
        .store(store)
        .serializer(order::serializer())
        .observer(|event: &OrderEvent| {
            tracing::info!(
                event_type = %event.event_type(),
                version = %event.event_version(),
                "order event persisted"
            );
        })
        .debug(config.debug)
        .build();

    let id = &config.order_id;
    let commands = [
        OrderCommand::place(id, "Jones"),
        OrderCommand::add_item(id, "SKU-001", 2, 1250),
        OrderCommand::add_item(id, "SKU-002", 1, 499),
        OrderCommand::ship(id),
        OrderCommand::cancel(id, "shipped orders cannot be cancelled"),
    ];
    for command in &commands {
        apply(&repository, command).await?;
    }

    let (order, version) = repository.load(id).await?;
    tracing::info!(
        order_id = %id,
        %version,
        state = ?order.state,
        items = order.items.len(),
        total_cents = order.total_cents(),
        "order rebuilt from history"
    );
    Ok(version)
}

/// Applies a command, logging a rejection instead of failing the run.
async fn apply<S: EventStore>(
    repository: &Repository<Order, S>,
    command: &OrderCommand,
) -> Result<(), DomainError> {
    match repository.apply(command).await {
        Ok(version) => {
            tracing::debug!(%version, ?command, "command applied");
            Ok(())
        }
        Err(DomainError::Rejected(reason)) => {
            tracing::warn!(%reason, ?command, "command rejected");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
