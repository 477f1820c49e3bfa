//! Bookkeeping for GitHub bearer tokens handed out through OAuth.
//!
//! Two disjoint maps are kept: active and revoked. Revocation is checked on
//! its own and always wins, so re-remembering a revoked token does not make
//! it usable again. Nothing here survives a process restart.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use crate::error::LedgerError;

/// Who touched a token, captured from the incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub reason: Option<String>,
}

impl AuditContext {
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Later values win, absent values keep what was there.
    fn merge(&mut self, other: &AuditContext) {
        if other.ip.is_some() {
            self.ip = other.ip.clone();
        }
        if other.user_agent.is_some() {
            self.user_agent = other.user_agent.clone();
        }
        if other.reason.is_some() {
            self.reason = other.reason.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub created_at: OffsetDateTime,
    pub last_used_at: Option<OffsetDateTime>,
    pub revoked_at: Option<OffsetDateTime>,
    pub audit: AuditContext,
}

impl TokenRecord {
    fn new(now: OffsetDateTime, audit: AuditContext) -> Self {
        Self {
            created_at: now,
            last_used_at: None,
            revoked_at: None,
            audit,
        }
    }
}

/// Storage behind the ledger: an active map and a revoked map keyed by token.
pub trait TokenStore: Send + Sync {
    fn get_active(&self, token: &str) -> Option<TokenRecord>;
    fn put_active(&self, token: &str, record: TokenRecord);
    fn remove_active(&self, token: &str) -> Option<TokenRecord>;
    fn put_revoked(&self, token: &str, record: TokenRecord);
    fn is_revoked(&self, token: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    active: Mutex<HashMap<String, TokenRecord>>,
    revoked: Mutex<HashMap<String, TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_active(&self, token: &str) -> Option<TokenRecord> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }

    fn put_active(&self, token: &str, record: TokenRecord) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string(), record);
    }

    fn remove_active(&self, token: &str) -> Option<TokenRecord> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
    }

    fn put_revoked(&self, token: &str, record: TokenRecord) {
        self.revoked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string(), record);
    }

    fn is_revoked(&self, token: &str) -> bool {
        self.revoked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(token)
    }
}

#[derive(Clone)]
pub struct TokenLedger {
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for TokenLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLedger").finish_non_exhaustive()
    }
}

impl Default for TokenLedger {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TokenLedger {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    pub fn remember(&self, token: &str, audit: &AuditContext) {
        if token.is_empty() {
            return;
        }
        let now = OffsetDateTime::now_utc();
        self.store
            .put_active(token, TokenRecord::new(now, audit.clone()));
        audit_log("TOKEN_STORED", token, now, audit);
    }

    pub fn mark_used(&self, token: &str, audit: &AuditContext) {
        if token.is_empty() {
            return;
        }
        let now = OffsetDateTime::now_utc();
        let mut record = self
            .store
            .get_active(token)
            .unwrap_or_else(|| TokenRecord::new(now, AuditContext::default()));
        record.last_used_at = Some(now);
        record.audit.merge(audit);
        self.store.put_active(token, record);
        audit_log("TOKEN_USED", token, now, audit);
    }

    pub fn revoke(&self, token: &str, audit: &AuditContext) -> Result<(), LedgerError> {
        if token.is_empty() {
            return Err(LedgerError::MissingToken);
        }
        let now = OffsetDateTime::now_utc();
        let mut record = self
            .store
            .remove_active(token)
            .unwrap_or_else(|| TokenRecord::new(now, AuditContext::default()));
        record.revoked_at = Some(now);
        record.audit.merge(audit);
        self.store.put_revoked(token, record);
        audit_log("TOKEN_REVOKED", token, now, audit);
        Ok(())
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        !token.is_empty() && self.store.is_revoked(token)
    }

    /// Remembered and not revoked.
    pub fn is_active(&self, token: &str) -> bool {
        !self.is_revoked(token) && self.store.get_active(token).is_some()
    }

    pub fn clear_session(&self, token: &str) {
        if token.is_empty() {
            return;
        }
        if self.store.remove_active(token).is_some() {
            audit_log(
                "SESSION_CLEARED",
                token,
                OffsetDateTime::now_utc(),
                &AuditContext::default(),
            );
        }
    }
}

/// First and last few characters only; short tokens keep two on each side.
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return "[no-token]".to_string();
    }
    let chars: Vec<char> = token.chars().collect();
    let keep = if chars.len() <= 8 { 2 } else { 4 };
    let keep = keep.min(chars.len() / 2);
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{head}***{tail}")
}

fn audit_log(action: &str, token: &str, at: OffsetDateTime, audit: &AuditContext) {
    let ts = at.format(&Rfc3339).unwrap_or_else(|_| "unknown".to_string());
    info!(
        target: "codexray::audit",
        action,
        at = %ts,
        token = %mask_token(token),
        ip = audit.ip.as_deref().unwrap_or("-"),
        ua = audit.user_agent.as_deref().unwrap_or("-"),
        reason = audit.reason.as_deref().unwrap_or("-"),
        "github token audit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> AuditContext {
        AuditContext {
            ip: Some("10.0.0.1".into()),
            user_agent: Some("test-agent".into()),
            reason: None,
        }
    }

    #[test]
    fn revocation_survives_remember() {
        let ledger = TokenLedger::in_memory();
        ledger.remember("gho_abcdef123456", &ctx());
        assert!(ledger.is_active("gho_abcdef123456"));

        ledger
            .revoke("gho_abcdef123456", &ctx().with_reason("disconnect"))
            .unwrap();
        assert!(ledger.is_revoked("gho_abcdef123456"));

        ledger.remember("gho_abcdef123456", &ctx());
        assert!(ledger.is_revoked("gho_abcdef123456"));
        assert!(!ledger.is_active("gho_abcdef123456"));
    }

    #[test]
    fn revoke_requires_token() {
        let ledger = TokenLedger::in_memory();
        assert_eq!(
            ledger.revoke("", &AuditContext::default()),
            Err(LedgerError::MissingToken)
        );
    }

    #[test]
    fn empty_token_operations_are_noops() {
        let store = Arc::new(MemoryTokenStore::new());
        let ledger = TokenLedger::new(store.clone());
        ledger.remember("", &ctx());
        ledger.mark_used("", &ctx());
        ledger.clear_session("");
        assert!(!ledger.is_revoked(""));
        assert!(store.active.lock().unwrap().is_empty());
    }

    #[test]
    fn mark_used_records_timestamp_and_merges_audit() {
        let store = Arc::new(MemoryTokenStore::new());
        let ledger = TokenLedger::new(store.clone());
        ledger.remember("tok-1234567890", &ctx());
        ledger.mark_used(
            "tok-1234567890",
            &AuditContext {
                ip: Some("10.0.0.2".into()),
                ..Default::default()
            },
        );
        let record = store.get_active("tok-1234567890").unwrap();
        assert!(record.last_used_at.is_some());
        assert_eq!(record.audit.ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(record.audit.user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn revoke_moves_record_between_maps() {
        let store = Arc::new(MemoryTokenStore::new());
        let ledger = TokenLedger::new(store.clone());
        ledger.remember("tok-1234567890", &ctx());
        ledger.revoke("tok-1234567890", &ctx()).unwrap();
        assert!(store.get_active("tok-1234567890").is_none());
        let revoked = store.revoked.lock().unwrap();
        let record = revoked.get("tok-1234567890").unwrap();
        assert!(record.revoked_at.is_some());
    }

    #[test]
    fn clear_session_keeps_revocation() {
        let ledger = TokenLedger::in_memory();
        ledger.remember("tok-abc", &ctx());
        ledger.clear_session("tok-abc");
        assert!(!ledger.is_active("tok-abc"));
        assert!(!ledger.is_revoked("tok-abc"));
    }

    #[test]
    fn masks_tokens() {
        assert_eq!(mask_token(""), "[no-token]");
        assert_eq!(mask_token("abcdefgh"), "ab***gh");
        assert_eq!(mask_token("gho_1234567890wxyz"), "gho_***wxyz");
        assert_eq!(mask_token("abc"), "a***c");
        assert!(!mask_token("gho_1234567890wxyz").contains("1234567890"));
    }
}
