use std::fmt;

/// Dispatch-resolution failure.
///
/// Every variant except [`DispatchError::Action`] is offered to the
/// `dispatch:beforeException` hook before it is returned to the caller.
#[derive(Debug)]
pub enum DispatchError {
    /// No `router` service, or the service is not an `Arc<dyn Router>`
    RouterNotRegistered,
    /// The module path is missing, or its class was not registered
    ModuleNotFound {
        /// Module name as resolved by the router
        module: String,
        /// What was not found
        reason: String,
    },
    /// No controller is registered under the computed key
    ControllerNotFound {
        /// Computed controller key, e.g. `App::UsersController`
        controller: String,
    },
    /// The controller does not expose the computed action
    ActionNotFound {
        /// Controller key
        controller: String,
        /// Computed action name, e.g. `editAction`
        action: String,
    },
    /// The module was found but its `register` step failed
    ModuleRegistration {
        /// Module name
        module: String,
        /// Underlying failure
        source: anyhow::Error,
    },
    /// The action itself returned an error
    Action(anyhow::Error),
}

impl DispatchError {
    /// Stable, machine-friendly name of the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::RouterNotRegistered => "router_not_registered",
            DispatchError::ModuleNotFound { .. } => "module_not_found",
            DispatchError::ControllerNotFound { .. } => "controller_not_found",
            DispatchError::ActionNotFound { .. } => "action_not_found",
            DispatchError::ModuleRegistration { .. } => "module_registration",
            DispatchError::Action(_) => "action",
        }
    }

    /// Whether the error means the route points at nothing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DispatchError::ModuleNotFound { .. }
                | DispatchError::ControllerNotFound { .. }
                | DispatchError::ActionNotFound { .. }
        )
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::RouterNotRegistered => {
                write!(f, "A router must be registered as service 'router'")
            }
            DispatchError::ModuleNotFound { module, reason } => {
                write!(f, "Module '{module}' not found: {reason}")
            }
            DispatchError::ControllerNotFound { controller } => {
                write!(f, "Controller '{controller}' not found")
            }
            DispatchError::ActionNotFound { controller, action } => {
                write!(f, "Action '{action}' not found on controller '{controller}'")
            }
            DispatchError::ModuleRegistration { module, source } => {
                write!(f, "Module '{module}' failed to register: {source:#}")
            }
            DispatchError::Action(err) => write!(f, "Action failed: {err:#}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let inner: &(dyn std::error::Error + 'static) = match self {
            DispatchError::ModuleRegistration { source, .. } => source.as_ref(),
            DispatchError::Action(err) => err.as_ref(),
            _ => return None,
        };
        Some(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_not_found() {
        let err = DispatchError::ControllerNotFound {
            controller: "UsersController".into(),
        };
        assert_eq!(err.kind(), "controller_not_found");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Controller 'UsersController' not found");

        assert!(!DispatchError::RouterNotRegistered.is_not_found());
        assert!(!DispatchError::Action(anyhow::anyhow!("boom")).is_not_found());
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;
        let err = DispatchError::ModuleRegistration {
            module: "admin".into(),
            source: anyhow::anyhow!("database unavailable"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("database unavailable"));
        assert!(DispatchError::RouterNotRegistered.source().is_none());
    }
}
