use std::error::Error;
use std::sync::Arc;

use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use coldlib_core::callback::multi;
use coldlib_core::{Assembly, Callback, HandlerResult, Service, ServiceRegistry};

#[derive(Debug, Clone)]
struct GreetingOptions {
    name: String,
    shout: bool,
}

/// Service bound late by a background task.
struct Greeter {
    greetings: Assembly<String, String, GreetingOptions>,
}

impl Service for Greeter {}

/// Named service built through a factory.
struct Counter {
    label: String,
}

impl Service for Counter {
    fn instance_name(&self) -> Option<&str> {
        Some(self.label.as_str())
    }
}

fn greetings() -> Result<Assembly<String, String, GreetingOptions>, Box<dyn Error>> {
    let assembly = Assembly::builder()
        .instance_factory(|_: Option<&GreetingOptions>| String::from("Hello, "))
        .add_intermediate_consumer(|s, o| s.push_str(o.map_or("world", |o| o.name.as_str())))
        .identity_finalizer()
        .add_result_consumer(|s, o| {
            if o.is_some_and(|o| o.shout) {
                *s = s.to_uppercase();
            }
        })
        .default_options(GreetingOptions {
            name: "coldlib".to_string(),
            shout: false,
        })
        .build()?;
    Ok(assembly)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    // (A) Registry を用意し、後から bind される Greeter を待つ
    let registry = Arc::new(ServiceRegistry::new());
    let waiting = registry.wait_for::<Greeter>(None)?;

    let binder = Arc::clone(&registry);
    let assembly = greetings()?;
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        if let Err(e) = binder.bind(Greeter { greetings: assembly }) {
            tracing::error!(error = %e, "failed to bind greeter");
        }
    });

    let greeter = waiting.await?;
    info!(greeting = %greeter.greetings.build(), "greeter bound");
    let loud = GreetingOptions {
        name: "registry".to_string(),
        shout: true,
    };
    info!(greeting = %greeter.greetings.build_with(&loud), "explicit options");

    // (B) factory で名前付きサービスを生成
    registry.register_factory(|_, name| {
        Ok(Counter {
            label: name.unwrap_or("default").to_string(),
        })
    });
    let jobs = registry.get_or_create::<Counter>(Some("jobs"))?;
    info!(label = %jobs.label, "counter created");

    // (C) multi callback: 常駐ハンドラと一度きりのハンドラ
    let events = Arc::new(multi::<String>());
    events.then_consume(|event| info!(event = ?event, "persistent handler"));
    events.then(|event| {
        info!(event = ?event, "one-shot handler");
        HandlerResult::Remove
    });
    let next = events.await_call();

    events.call(Some("started".to_string()));
    events.call(Some("running".to_string()));
    let resolved = next.await?;
    info!(resolved = ?resolved, handlers = events.handler_count(), "callback settled");

    // (D) ステータスを JSON で出力
    let status = registry.status();
    println!("{}", serde_json::to_string_pretty(&status)?);

    Ok(())
}
