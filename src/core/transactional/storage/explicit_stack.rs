use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;

use super::{Bindings, StorageDriver, StorageValue};

type Layer = Arc<Mutex<Bindings>>;

thread_local! {
    static LAYERS: RefCell<Vec<Layer>> = const { RefCell::new(Vec::new()) };
}

/// Context store that keeps a per-thread stack of binding layers.
///
/// A scope's layer is pushed every time its future is polled and popped when
/// the poll returns, so interleaved call chains on one executor each see
/// their own layer. Works on any executor.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitStackDriver;

impl ExplicitStackDriver {
    fn top() -> Option<Layer> {
        LAYERS.with(|layers| layers.borrow().last().cloned())
    }

    fn enter(layer: &Layer) {
        LAYERS.with(|layers| layers.borrow_mut().push(layer.clone()));
    }

    /// Pops `layer`, searching from the top when scopes finished out of order.
    fn exit(layer: &Layer) {
        LAYERS.with(|layers| {
            let mut layers = layers.borrow_mut();
            if layers.last().is_some_and(|top| Arc::ptr_eq(top, layer)) {
                layers.pop();
                return;
            }
            if let Some(index) = layers.iter().rposition(|entry| Arc::ptr_eq(entry, layer)) {
                layers.remove(index);
            }
        });
    }
}

impl StorageDriver for ExplicitStackDriver {
    type Scoped<F: Future> = LayerScoped<F>;

    fn is_active(&self) -> bool {
        LAYERS.with(|layers| !layers.borrow().is_empty())
    }

    fn get(&self, key: &str) -> Option<StorageValue> {
        Self::top().and_then(|layer| layer.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Option<StorageValue>) {
        if let Some(layer) = Self::top() {
            let mut bindings = layer.lock();
            match value {
                Some(value) => bindings.insert(key.to_string(), value),
                None => bindings.remove(key),
            };
        }
    }

    fn run_scoped<F: Future>(&self, fut: F) -> Self::Scoped<F> {
        let snapshot = Self::top()
            .map(|layer| layer.lock().clone())
            .unwrap_or_default();
        LayerScoped {
            layer: Arc::new(Mutex::new(snapshot)),
            inner: Box::pin(fut),
        }
    }
}

/// Future returned by [`ExplicitStackDriver::run_scoped`].
pub struct LayerScoped<F> {
    layer: Layer,
    inner: Pin<Box<F>>,
}

struct Entered<'a> {
    layer: &'a Layer,
}

impl<'a> Entered<'a> {
    fn new(layer: &'a Layer) -> Self {
        ExplicitStackDriver::enter(layer);
        Self { layer }
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        ExplicitStackDriver::exit(self.layer);
    }
}

impl<F: Future> Future for LayerScoped<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _entered = Entered::new(&this.layer);
        this.inner.as_mut().poll(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_order_exit_removes_the_matching_layer() {
        let first: Layer = Arc::new(Mutex::new(Bindings::new()));
        let second: Layer = Arc::new(Mutex::new(Bindings::new()));
        ExplicitStackDriver::enter(&first);
        ExplicitStackDriver::enter(&second);

        ExplicitStackDriver::exit(&first);
        assert!(ExplicitStackDriver::top().is_some_and(|top| Arc::ptr_eq(&top, &second)));

        ExplicitStackDriver::exit(&second);
        assert!(!ExplicitStackDriver.is_active());
    }
}
