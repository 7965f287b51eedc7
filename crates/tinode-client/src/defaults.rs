/// Targets used when a command names none.
///
/// Set by `.use`, live for one run, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDefaults {
    /// User requests act on behalf of.
    pub user: Option<String>,
    /// Topic used when a command omits one.
    pub topic: Option<String>,
}

impl SessionDefaults {
    /// `explicit` if given, else the default topic.
    pub fn topic_or(&self, explicit: Option<String>) -> Option<String> {
        explicit.or_else(|| self.topic.clone())
    }

    /// Acting user for requests that carry one.
    pub fn acting_user(&self) -> Option<String> {
        self.user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_topic_wins() {
        let defaults = SessionDefaults { user: None, topic: Some("grp1".into()) };
        assert_eq!(defaults.topic_or(Some("grp2".into())).as_deref(), Some("grp2"));
        assert_eq!(defaults.topic_or(None).as_deref(), Some("grp1"));
        assert_eq!(SessionDefaults::default().topic_or(None), None);
    }
}
