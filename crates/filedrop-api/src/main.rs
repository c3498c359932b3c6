use filedrop_api::setup;
use filedrop_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Storage root, post-processing workers, routes
    let (state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, state, router).await?;

    Ok(())
}
