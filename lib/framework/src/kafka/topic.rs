use std::marker::PhantomData;

/// Binds a topic name to its message type, so producer sends and consumer
/// handlers of the same topic agree on the payload schema at compile time.
pub struct Topic<T> {
    pub name: &'static str,
    _marker: PhantomData<T>,
}

impl<T> Topic<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}
