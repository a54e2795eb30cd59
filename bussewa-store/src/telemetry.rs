use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// filter. Calling it again is a no-op, so every test can call it.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bussewa_seating=info,bussewa_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_init_twice() {
        super::init();
        super::init();
        tracing::info!("telemetry initialised");
    }
}
