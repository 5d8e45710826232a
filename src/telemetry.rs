//! Log subscriber setup shared by the server and the tool binaries.

/// `RUST_LOG` when set, else `saintsophia=info` plus `default_directive` (e.g. `saintsophia_server=info`).
pub fn init_tracing(default_directive: Option<&str>) {
    let fallback = match default_directive {
        Some(extra) => format!("saintsophia=info,{}", extra),
        None => "saintsophia=info".to_string(),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_target(false)
        .try_init();
}
