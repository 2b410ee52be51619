use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::collab::store::{DocumentStore, WriteMode, membership_path};
use crate::error::CollabError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub amount_cents: u64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Open,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub user_id: String,
    pub plan_id: String,
    /// Where the customer is sent to pay.
    pub redirect_url: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entitlement {
    pub user_id: String,
    pub plan_id: String,
    pub session_id: String,
    pub granted_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Granted(Entitlement),
    /// The session was confirmed before; nothing new was granted.
    AlreadyGranted(Entitlement),
}

impl Confirmation {
    pub fn entitlement(&self) -> &Entitlement {
        match self {
            Confirmation::Granted(entitlement) | Confirmation::AlreadyGranted(entitlement) => {
                entitlement
            }
        }
    }
}

/// Checkout sessions. `confirm` must be safe to call repeatedly.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        user_id: &str,
        plan_id: &str,
    ) -> Result<CheckoutSession, CollabError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, CollabError>;

    async fn confirm(&self, session_id: &str) -> Result<Confirmation, CollabError>;
}

struct SessionRecord {
    session: CheckoutSession,
    entitlement: Option<Entitlement>,
}

/// In-process payment sessions over a fixed plan catalog.
pub struct MemoryPaymentProvider {
    plans: BTreeMap<String, Plan>,
    checkout_url: String,
    sessions: Mutex<HashMap<String, SessionRecord>>,
    memberships: Option<(Arc<dyn DocumentStore>, String)>,
}

impl MemoryPaymentProvider {
    pub fn new(plans: impl IntoIterator<Item = Plan>) -> Self {
        Self {
            plans: plans
                .into_iter()
                .map(|plan| (plan.id.clone(), plan))
                .collect(),
            checkout_url: "memory://checkout".into(),
            sessions: Mutex::new(HashMap::new()),
            memberships: None,
        }
    }

    pub fn with_checkout_url(mut self, url: impl Into<String>) -> Self {
        self.checkout_url = url.into();
        self
    }

    /// Records granted memberships under `<prefix>/<user>/membership`.
    pub fn with_membership_store(
        mut self,
        store: Arc<dyn DocumentStore>,
        prefix: impl Into<String>,
    ) -> Self {
        self.memberships = Some((store, prefix.into()));
        self
    }

    pub fn plan(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.get(plan_id)
    }

    /// Settles a session, as the processor's webhook would.
    pub async fn mark_paid(&self, session_id: &str) -> Result<(), CollabError> {
        let mut sessions = self.sessions.lock().await;
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| CollabError::NotFound(session_id.to_string()))?;
        record.session.status = PaymentStatus::Paid;
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for MemoryPaymentProvider {
    async fn create_checkout_session(
        &self,
        user_id: &str,
        plan_id: &str,
    ) -> Result<CheckoutSession, CollabError> {
        if user_id.trim().is_empty() {
            return Err(CollabError::Invalid("user id is empty".into()));
        }
        if !self.plans.contains_key(plan_id) {
            return Err(CollabError::NotFound(format!("plan {plan_id}")));
        }
        let session_id = format!("cs_{}", Uuid::new_v4().simple());
        let session = CheckoutSession {
            redirect_url: format!("{}/{session_id}", self.checkout_url.trim_end_matches('/')),
            session_id: session_id.clone(),
            user_id: user_id.to_string(),
            plan_id: plan_id.to_string(),
            status: PaymentStatus::Open,
        };
        self.sessions.lock().await.insert(
            session_id,
            SessionRecord {
                session: session.clone(),
                entitlement: None,
            },
        );
        Ok(session)
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, CollabError> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(|record| record.session.clone())
            .ok_or_else(|| CollabError::NotFound(session_id.to_string()))
    }

    async fn confirm(&self, session_id: &str) -> Result<Confirmation, CollabError> {
        // Held across the membership write so concurrent confirms grant once.
        let mut sessions = self.sessions.lock().await;
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| CollabError::NotFound(session_id.to_string()))?;

        if let Some(entitlement) = &record.entitlement {
            warn!(session_id, "payment session already confirmed");
            return Ok(Confirmation::AlreadyGranted(entitlement.clone()));
        }
        if record.session.status != PaymentStatus::Paid {
            return Err(CollabError::PaymentPending(session_id.to_string()));
        }

        let entitlement = Entitlement {
            user_id: record.session.user_id.clone(),
            plan_id: record.session.plan_id.clone(),
            session_id: session_id.to_string(),
            granted_at: quiz_spec::now_rfc3339(),
        };
        if let Some((store, prefix)) = &self.memberships {
            let path = membership_path(prefix, &entitlement.user_id);
            let membership = json!({
                "active": true,
                "plan_id": entitlement.plan_id,
                "session_id": entitlement.session_id,
                "granted_at": entitlement.granted_at,
            });
            store.write(&path, membership, WriteMode::Merge).await?;
        }
        record.entitlement = Some(entitlement.clone());
        info!(session_id, user_id = %entitlement.user_id, plan_id = %entitlement.plan_id, "entitlement granted");
        Ok(Confirmation::Granted(entitlement))
    }
}
