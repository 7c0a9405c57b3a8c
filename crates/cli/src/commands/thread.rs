use serde::Serialize;

use brainrelay_core::config::{AppConfig, LoadOptions};
use brainrelay_core::domain::thread::{ChannelId, ThreadId, ThreadState};
use brainrelay_db::{connect_with_config, SqlThreadStateRepository, ThreadStateRepository};

use crate::commands::{current_thread_runtime, exit, CommandResult};

#[derive(Serialize)]
struct ThreadReport {
    #[serde(flatten)]
    state: ThreadState,
    awaiting_selection: bool,
}

impl From<ThreadState> for ThreadReport {
    fn from(state: ThreadState) -> Self {
        let awaiting_selection = state.awaiting_selection();
        Self { state, awaiting_selection }
    }
}

/// Prints everything stored for one thread. Unknown threads print an empty state.
pub fn run(channel_id: &str, thread_ts: &str) -> CommandResult {
    let (channel_id, thread_ts) = (channel_id.trim(), thread_ts.trim());
    if channel_id.is_empty() || thread_ts.is_empty() {
        return CommandResult::failure(
            "thread",
            "usage",
            "channel id and thread timestamp must not be empty",
            exit::CONFIG,
        );
    }
    let thread_id = ThreadId::new(ChannelId(channel_id.to_owned()), thread_ts);

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "thread",
                "config_validation",
                format!("configuration issue: {error}"),
                exit::CONFIG,
            );
        }
    };

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "thread",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                exit::RUNTIME,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string()))?;
        let repository = SqlThreadStateRepository::new(pool.clone());
        let state = repository
            .find_thread(&thread_id)
            .await
            .map_err(|error| ("thread_lookup", error.to_string()));
        pool.close().await;
        state
    });

    match result {
        Ok(state) => match serde_json::to_string_pretty(&ThreadReport::from(state)) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure("thread", "serialization", error.to_string(), 1),
        },
        Err((error_class, message)) => {
            CommandResult::failure("thread", error_class, message, exit::DATABASE)
        }
    }
}
