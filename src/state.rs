/// Where a promise is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

impl PromiseState {
    pub fn is_settled(self) -> bool {
        !matches!(self, PromiseState::Pending)
    }
}

/// The outcome of a settled promise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settlement<T, E> {
    pub fn state(&self) -> PromiseState {
        match self {
            Settlement::Fulfilled(_) => PromiseState::Fulfilled,
            Settlement::Rejected(_) => PromiseState::Rejected,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Settlement::Fulfilled(value) => Some(value),
            Settlement::Rejected(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&E> {
        match self {
            Settlement::Fulfilled(_) => None,
            Settlement::Rejected(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Settlement::Fulfilled(value) => Ok(value),
            Settlement::Rejected(reason) => Err(reason),
        }
    }
}

impl<T, E> From<Result<T, E>> for Settlement<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Settlement::Fulfilled(value),
            Err(reason) => Settlement::Rejected(reason),
        }
    }
}

/// Internal state block; payloads live here only once settled.
#[derive(Debug)]
pub(crate) enum State<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T: Clone, E: Clone> State<T, E> {
    pub(crate) fn kind(&self) -> PromiseState {
        match self {
            State::Pending => PromiseState::Pending,
            State::Fulfilled(_) => PromiseState::Fulfilled,
            State::Rejected(_) => PromiseState::Rejected,
        }
    }

    pub(crate) fn settlement(&self) -> Option<Settlement<T, E>> {
        match self {
            State::Pending => None,
            State::Fulfilled(value) => Some(Settlement::Fulfilled(value.clone())),
            State::Rejected(reason) => Some(Settlement::Rejected(reason.clone())),
        }
    }
}

impl<T, E> From<Settlement<T, E>> for State<T, E> {
    fn from(settlement: Settlement<T, E>) -> Self {
        match settlement {
            Settlement::Fulfilled(value) => State::Fulfilled(value),
            Settlement::Rejected(reason) => State::Rejected(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_accessors() {
        let ok: Settlement<i32, String> = Settlement::Fulfilled(3);
        assert_eq!(ok.value(), Some(&3));
        assert_eq!(ok.reason(), None);
        assert_eq!(ok.state(), PromiseState::Fulfilled);
        assert_eq!(ok.into_result(), Ok(3));

        let err: Settlement<i32, String> = Err("no".to_string()).into();
        assert_eq!(err.reason().map(String::as_str), Some("no"));
        assert!(err.state().is_settled());
    }

    #[test]
    fn state_snapshots() {
        let pending: State<i32, ()> = State::Pending;
        assert_eq!(pending.kind(), PromiseState::Pending);
        assert_eq!(pending.settlement(), None);

        let done: State<i32, ()> = Settlement::Fulfilled(1).into();
        assert_eq!(done.settlement(), Some(Settlement::Fulfilled(1)));
    }
}
