use std::fmt;
use std::sync::{Arc, Weak};

/// A protocol session a worker thread can check out.
///
/// Sessions are owned elsewhere in the daemon; the bus only forwards a
/// [`SessionRef`] to listeners so they can label output.
pub trait Session: Send + Sync + fmt::Debug {
    /// Configured name of the session.
    fn name(&self) -> &str;

    /// Unique numeric identifier of the session.
    fn unique_id(&self) -> u32;
}

/// Non-owning handle to a [`Session`].
///
/// The bus never keeps a session alive. A listener that needs the session
/// calls [`SessionRef::upgrade`] and copes with `None` if it is already gone.
#[derive(Clone)]
pub struct SessionRef(Weak<dyn Session>);

impl SessionRef {
    #[must_use]
    pub fn new<S: Session + 'static>(session: &Arc<S>) -> Self {
        let weak = Arc::downgrade(session) as Weak<dyn Session>;
        Self(weak)
    }

    #[must_use]
    pub fn upgrade(&self) -> Option<Arc<dyn Session>> {
        self.0.upgrade()
    }

    /// Whether this handle points at `session`.
    #[must_use]
    pub fn refers_to<S: Session + 'static>(&self, session: &Arc<S>) -> bool {
        std::ptr::addr_eq(self.0.as_ptr(), Arc::as_ptr(session))
    }

    /// `name[id]` label, or `None` once the session is gone.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.upgrade().map(|s| format!("{}[{}]", s.name(), s.unique_id()))
    }
}

impl PartialEq for SessionRef {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SessionRef {}

impl fmt::Debug for SessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => f.debug_tuple("SessionRef").field(&label).finish(),
            None => f.write_str("SessionRef(<released>)"),
        }
    }
}

impl<S: Session + 'static> From<&Arc<S>> for SessionRef {
    fn from(session: &Arc<S>) -> Self {
        Self::new(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Conn(u32);

    impl Session for Conn {
        fn name(&self) -> &str {
            "home"
        }

        fn unique_id(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_ref_does_not_own() {
        let conn = Arc::new(Conn(4));
        let handle = SessionRef::new(&conn);
        assert_eq!(handle.label().as_deref(), Some("home[4]"));
        assert!(handle.refers_to(&conn));

        drop(conn);
        assert!(handle.upgrade().is_none());
        assert_eq!(format!("{handle:?}"), "SessionRef(<released>)");
    }

    #[test]
    fn test_equality_is_identity() {
        let a = Arc::new(Conn(1));
        let b = Arc::new(Conn(1));
        assert_eq!(SessionRef::new(&a), SessionRef::from(&a));
        assert_ne!(SessionRef::new(&a), SessionRef::new(&b));
    }
}
