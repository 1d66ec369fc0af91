use log::info;

use crate::models::TrainingSession;

pub trait ProgressReporter: Send + Sync {
    fn report_training_progress(&self, bot_id: &str, message: &str, session: &TrainingSession);
}

/// Reports training progress through the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgressReporter;

impl ProgressReporter for LogProgressReporter {
    fn report_training_progress(&self, bot_id: &str, message: &str, session: &TrainingSession) {
        info!(
            "[{}] {} (language: {}, status: {:?}, progress: {:.0}%)",
            bot_id,
            message,
            session.language,
            session.status,
            session.progress * 100.
        );
    }
}
