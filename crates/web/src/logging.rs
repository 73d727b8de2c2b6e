use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;

/// Installs a formatting subscriber printing events up to `level` as the global default.
///
/// Fails when a global subscriber is already set.
pub fn init(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)
}
