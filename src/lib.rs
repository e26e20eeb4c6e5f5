pub mod config;
pub mod platform_stub;

use std::sync::Arc;

use engine::Engine;

use self::config::Config;
use self::platform_stub::DefaultPlatform;

/// Opens a function to replace `main` so integration tests (and any future
/// `api` front end) can start the engine directly, the way the teacher
/// separates `startup` from its binary's `main`.
pub async fn startup(config: Arc<Config>) -> anyhow::Result<()> {
    let platform = DefaultPlatform::new(config.paa.v4_pool_start, config.paa.v4_pool_end);
    let _engine = Engine::new(platform, config.to_engine_config());

    log::info!(
        "s-gw engine ready: s11={} s1u={}",
        config.s11_address(),
        config.s1u_address()
    );

    // No S11/GTP-U wire task is in scope (Non-goals): the engine only
    // answers calls made directly against it. Keep the process alive so a
    // future wire front end has somewhere to plug in.
    std::future::pending::<()>().await;

    Ok(())
}
