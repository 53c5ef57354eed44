/// Reply templates and help rendering
pub mod answers;
/// Free-text command classification
pub mod classifier;
/// The inbox polling loop
pub mod dispatcher;

use std::sync::Arc;

use crate::config::BotSettings;
use crate::database::connection::DatabaseManager;
use crate::platform::PlatformClient;
use crate::services::diary::DiaryApi;

/// Everything the dispatcher needs to handle a message.
///
/// Constructed once at startup, after configuration and session load, and
/// shared read-only with the polling task.
pub struct BotContext<P: PlatformClient, D: DiaryApi> {
    pub platform: Arc<P>,
    pub diary: D,
    pub db: DatabaseManager,
    pub settings: BotSettings,
    /// The bot's own account id; its outbound messages are filtered out.
    pub account_id: i64,
}
