use thiserror::Error;

const RESERVED_PREFIXES: [&str; 3] = ["$SYS/", "$share/", "$queue/"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    #[error("topic uses a reserved prefix")]
    ReservedTopic,
}

/// Rewrites a client-facing topic into its tenant-namespaced storage form:
/// `tenants/{tenant_id}/{topic}`.
///
/// Pure function, no I/O — every hook call site runs this synchronously.
/// Topics starting with a reserved broker prefix (`$SYS/`, `$share/`,
/// `$queue/`) are rejected outright; tenants never get to namespace into or
/// subscribe across broker-internal topic space.
pub fn rewrite(topic: &str, tenant_id: i64) -> Result<String, TopicError> {
    if is_reserved(topic) {
        return Err(TopicError::ReservedTopic);
    }
    Ok(format!("tenants/{tenant_id}/{topic}"))
}

/// Strips a previously rewritten topic back to its client-facing form.
/// Returns `None` if `topic` isn't namespaced under `tenant_id`.
pub fn strip(topic: &str, tenant_id: i64) -> Option<&str> {
    let prefix = format!("tenants/{tenant_id}/");
    topic.strip_prefix(prefix.as_str())
}

pub fn is_reserved(topic: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|prefix| topic.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_namespaces_under_tenant() {
        assert_eq!(rewrite("sensors/temp", 7).unwrap(), "tenants/7/sensors/temp");
    }

    #[test]
    fn rewrite_rejects_sys_prefix() {
        assert_eq!(rewrite("$SYS/broker/uptime", 7), Err(TopicError::ReservedTopic));
    }

    #[test]
    fn rewrite_rejects_share_and_queue_prefixes() {
        assert_eq!(rewrite("$share/group/topic", 1), Err(TopicError::ReservedTopic));
        assert_eq!(rewrite("$queue/topic", 1), Err(TopicError::ReservedTopic));
    }

    #[test]
    fn rewrite_accepts_empty_topic_segment() {
        assert_eq!(rewrite("", 1).unwrap(), "tenants/1/");
    }

    #[test]
    fn strip_recovers_original_topic() {
        let rewritten = rewrite("sensors/temp", 7).unwrap();
        assert_eq!(strip(&rewritten, 7), Some("sensors/temp"));
    }

    #[test]
    fn strip_rejects_foreign_tenant_prefix() {
        let rewritten = rewrite("sensors/temp", 7).unwrap();
        assert_eq!(strip(&rewritten, 8), None);
    }
}
