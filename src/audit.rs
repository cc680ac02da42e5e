use std::collections::VecDeque;
use std::fmt;
use crate::fragment::unix_now;
use crate::network::{SecretId, VaultError};

/// Entries kept by [`AuditLog::default`].
pub const DEFAULT_AUDIT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Protect,
    Retrieve,
    Delete,
    ImportCatalog,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::Protect => write!(f, "protect"),
            AuditAction::Retrieve => write!(f, "retrieve"),
            AuditAction::Delete => write!(f, "delete"),
            AuditAction::ImportCatalog => write!(f, "import-catalog"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: u64,
    pub action: AuditAction,
    pub secret_id: Option<SecretId>,
    /// `None` on success.
    pub error: Option<VaultError>,
}

impl AuditEntry {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Bounded, in-memory record of controller actions. Oldest entries are dropped.
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
    capacity: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn log(&mut self, action: AuditAction, secret_id: Option<SecretId>, error: Option<VaultError>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(AuditEntry {
            timestamp: unix_now(),
            action,
            secret_id,
            error,
        });
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
