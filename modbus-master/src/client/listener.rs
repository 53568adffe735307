/// A generic listener type that can be invoked multiple times
pub trait Listener<T>: Send {
    /// inform the listener that the value has changed
    fn update(&mut self, _value: T) {}
}

/// Listener that does nothing
#[derive(Copy, Clone, Debug, Default)]
pub struct NullListener;

impl NullListener {
    /// create a `Box<dyn Listener<T>>` that does nothing
    pub fn create<T>() -> Box<dyn Listener<T>> {
        Box::new(NullListener)
    }
}

impl<T> Listener<T> for NullListener {}

/// Listener that forwards every value to a closure
impl<T, F> Listener<T> for F
where
    F: FnMut(T) + Send,
{
    fn update(&mut self, value: T) {
        self(value)
    }
}

/// State of a master's connection
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// no connection, calls fail with `NoConnection`
    Disconnected,
    /// connect or reconnect in progress
    Connecting,
    /// connection established
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected => f.write_str("connected"),
        }
    }
}
