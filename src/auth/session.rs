use dashmap::DashMap;

/// Session state stamped once by the authenticator at CONNECT and read by
/// every authorization hook on the same connection. Nothing mutates it
/// after creation — credential rotation does not reach in-flight sessions
/// (see the open question on mid-session revocation).
#[derive(Debug, Clone)]
pub struct Session {
    pub tenant_id: i64,
    pub device_id: String,
}

/// Keyed by MQTT client id. One entry per live TCP connection.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: std::sync::Arc<DashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, client_id: &str, session: Session) {
        self.sessions.insert(client_id.to_string(), session);
    }

    pub fn get(&self, client_id: &str) -> Option<Session> {
        self.sessions.get(client_id).map(|entry| entry.clone())
    }

    pub fn remove(&self, client_id: &str) {
        self.sessions.remove(client_id);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}
