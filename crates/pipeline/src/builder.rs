//! Topology construction from configuration
//!
//! Builds the routing map and sink registry a reload installs. Everything
//! here happens off to the side of the running pipeline; nothing is visible
//! to the router until the caller swaps.

use std::sync::Arc;

use courier_config::{
    BackoffKind, CodecKind, Config, FailureKind, OverflowKind, SinkConfig, SinkKind, SinkTuning,
};
use courier_protocol::{JsonSerde, MessageSerde, RawSerde};
use courier_queue::{MessageQueue, OverflowPolicy, QueueConfig};
use courier_routing::RoutingMap;
use courier_sinks::{
    Backoff, BatchWrite, BlackholeSink, BrokerConfig, BrokerSink, EngineConfig, FailurePolicy,
    FileConfig, FileSink, QueuedSink,
};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::registry::{SinkRegistry, SinkRuntime};

/// Build the routing map from validated configuration
///
/// # Errors
///
/// Config validation already checks patterns and sink lists, so an error
/// here means the config was not validated - it is still propagated rather
/// than assumed away.
pub fn build_routing_map(config: &Config) -> Result<RoutingMap> {
    let mut builder = courier_routing::RoutingMapBuilder::new();
    for route in &config.routes {
        builder.add_rule(&route.pattern, route.sinks.clone())?;
    }
    Ok(builder.build())
}

/// Build and start a sink registry from validated configuration
///
/// Creates each sink's queue, writer, and engine, and spawns one engine
/// task per sink. Must run inside a tokio runtime.
pub fn build_registry(config: &Config) -> Result<SinkRegistry> {
    let mut registry = SinkRegistry::new();

    for (name, sink_config) in &config.sinks {
        registry.insert(start_sink(name, sink_config))?;
    }

    tracing::info!(sinks = registry.len(), "sink registry built");
    Ok(registry)
}

/// Create one sink's queue and engine and spawn its drain task
fn start_sink(name: &str, config: &SinkConfig) -> SinkRuntime {
    let queue = Arc::new(MessageQueue::new(queue_config(&config.tuning)));
    let writer = make_writer(&config.kind);
    let engine = QueuedSink::new(
        name,
        writer,
        Arc::clone(&queue),
        engine_config(&config.tuning),
    );
    let stats = engine.stats_handle();

    let token = CancellationToken::new();
    let task = tokio::spawn(engine.run(token.clone()));

    SinkRuntime::new(name, queue, token, task, stats)
}

/// Instantiate the writer for a sink type
fn make_writer(kind: &SinkKind) -> Box<dyn BatchWrite> {
    match kind {
        SinkKind::Broker {
            endpoint,
            serde,
            connect_timeout,
            write_timeout,
        } => {
            let broker_config = BrokerConfig::new(endpoint)
                .with_connect_timeout(*connect_timeout)
                .with_write_timeout(*write_timeout);
            let codec: Box<dyn MessageSerde> = match serde {
                CodecKind::Raw => Box::new(RawSerde),
                CodecKind::Json => Box::new(JsonSerde),
            };
            Box::new(BrokerSink::new(broker_config, codec))
        }
        SinkKind::File { path } => Box::new(FileSink::new(FileConfig::new(path))),
        SinkKind::Blackhole => Box::new(BlackholeSink::new()),
    }
}

fn queue_config(tuning: &SinkTuning) -> QueueConfig {
    let policy = match tuning.overflow {
        OverflowKind::Block => OverflowPolicy::Block {
            timeout: tuning.offer_timeout,
        },
        OverflowKind::FailFast => OverflowPolicy::FailFast,
        OverflowKind::DropOldest => OverflowPolicy::DropOldest,
    };
    QueueConfig {
        capacity: tuning.queue_capacity,
        policy,
    }
}

fn engine_config(tuning: &SinkTuning) -> EngineConfig {
    let backoff = match tuning.backoff {
        BackoffKind::Fixed => Backoff::Fixed(tuning.retry_base),
        BackoffKind::Exponential => Backoff::Exponential {
            base: tuning.retry_base,
            cap: tuning.retry_cap,
        },
    };
    let on_failure = match tuning.on_failure {
        FailureKind::Drop => FailurePolicy::Drop,
        FailureKind::Requeue => FailurePolicy::Requeue,
    };
    EngineConfig {
        batch_size: tuning.batch_size,
        batch_timeout: tuning.batch_timeout,
        max_retries: tuning.max_retries,
        backoff,
        on_failure,
        grace: tuning.grace,
    }
}
