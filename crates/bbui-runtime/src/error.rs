use bbui_data::DataError;
use thiserror::Error;

use crate::component::ComponentId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("component {0} is not mounted")]
    UnknownComponent(ComponentId),

    #[error("hook {index} of component {component} is not a {expected}")]
    HookOrder {
        component: ComponentId,
        index: usize,
        expected: &'static str,
    },

    #[error("component {component} called {actual} hooks, earlier renders called {expected}")]
    HookCountChanged {
        component: ComponentId,
        expected: usize,
        actual: usize,
    },
}
