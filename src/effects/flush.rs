//! Flushing a transition batch through the collaborators.

use std::thread;

use crate::core::TransitionBatch;
use crate::settings::EngineSettings;

use super::sink::{ActionError, ActionSink};
use super::store::{FolderId, VariableStore};

/// Flush a batch: actions strictly in emission order, then the variable
/// writes.
///
/// Failures are isolated per item. An unknown action identifier is
/// logged and the flush continues; any other action failure is logged as
/// unexpected and the flush continues; a failed variable write is logged
/// and the remaining writes still apply. There is no rollback of work
/// already applied. The configured pacing delay follows every invocation
/// attempt regardless of outcome; a zero delay skips the pause entirely.
pub fn flush_batch(
    batch: TransitionBatch,
    sink: &dyn ActionSink,
    store: &dyn VariableStore,
    folder: FolderId,
    settings: &EngineSettings,
) {
    let (actions, writes) = batch.into_parts();

    for action in &actions {
        match sink.invoke(action) {
            Ok(()) => {}
            Err(ActionError::Unknown(_)) => {
                if settings.log_missing {
                    tracing::info!("{action} (missing)");
                } else {
                    tracing::debug!("{action} (missing)");
                }
            }
            Err(err) => {
                tracing::error!("action '{action}' failed unexpectedly: {err}");
            }
        }
        if !settings.action_delay.is_zero() {
            thread::sleep(settings.action_delay);
        }
    }

    for (key, value) in writes {
        let written = store
            .get_or_create(&key, folder)
            .and_then(|var| store.write(var, &value));
        if let Err(err) = written {
            tracing::error!("variable '{key}' write failed: {err}");
        }
    }
}
