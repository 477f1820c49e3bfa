use anyhow::Result;
use tracing::info;

use crate::{AppContext, ServeArgs};
use codexray::server;
use codexray::AppState;

pub(crate) async fn handle_serve(ctx: &AppContext, args: ServeArgs) -> Result<()> {
    let config = &ctx.config;
    let state = AppState::from_config(config, args.ephemeral, ctx.timeout)?;
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    if args.ephemeral {
        info!("ephemeral mode: analyses are kept in memory");
    } else {
        info!(data_dir = %config.server.data_dir.display(), "storing analyses on disk");
    }
    server::serve(state, &bind, config.server.body_limit_bytes).await
}
