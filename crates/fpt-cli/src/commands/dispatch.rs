use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands::{self, Status};
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<Status> {
    match command {
        Commands::Backup(args) => commands::backup::handle(&args, ctx, flags).await,
        Commands::Backups { action } => commands::backups::handle(&action, ctx, flags).await,
        Commands::Restore(args) => commands::restore::handle(&args, ctx, flags).await,
        Commands::Notify { action } => commands::notify::handle(action, ctx, flags).await,
        Commands::Health => commands::health::handle(ctx, flags).await,
        Commands::Validate => commands::validate::handle(ctx, flags).await,
        Commands::Serve(args) => commands::serve::handle(&args, ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fpt_store::MemoryStore;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cli::subcommands::BackupsCommands;
    use crate::commands::test_support;

    #[tokio::test]
    async fn routes_to_the_command_handler() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mut ctx = test_support::context(dir.path(), &store);

        let listed = dispatch(
            Commands::Backups {
                action: BackupsCommands::List,
            },
            &mut ctx,
            &test_support::flags(),
        )
        .await
        .unwrap();

        assert_eq!(listed, Status::Success);
        assert_eq!(store.writes(), 0);
    }
}
