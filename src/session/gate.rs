use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::state::Validity;
use crate::backend::InterviewBackend;

/// Decides once whether an interview can still be recorded
#[derive(Clone)]
pub struct ValidityGate {
    backend: Arc<dyn InterviewBackend>,
}

impl ValidityGate {
    pub fn new(backend: Arc<dyn InterviewBackend>) -> Self {
        Self { backend }
    }

    pub async fn check(&self, interview_id: &str) -> Validity {
        self.check_at(interview_id, Utc::now()).await
    }

    /// Valid only while `now` is before the expiry date; any failure counts as invalid
    pub async fn check_at(&self, interview_id: &str, now: DateTime<Utc>) -> Validity {
        match self.backend.fetch_interview(interview_id).await {
            Ok(record) if now < record.expire_date => {
                info!(
                    "Interview {} is valid until {}",
                    interview_id, record.expire_date
                );
                Validity::Valid
            }
            Ok(record) => {
                warn!(
                    "Interview {} expired at {}",
                    interview_id, record.expire_date
                );
                Validity::Invalid
            }
            Err(e) => {
                warn!("Error checking interview {}: {}", interview_id, e);
                Validity::Invalid
            }
        }
    }
}
