//! One-shot scroll reveal.
//!
//! A [`RevealController`] owns at most one visibility observer for its
//! container. Elements matching the revealable selector are observed; the
//! first time one crosses the visibility threshold it gets the revealed class
//! and is unobserved for good. Teardown is synchronous and idempotent: it
//! disconnects the observer and aborts any pending discovery retry.

use std::{
    cell::RefCell,
    collections::HashSet,
    rc::{Rc, Weak},
    time::Duration,
};

use actix_web::rt;
use tokio::task::JoinHandle;

pub type ElementId = usize;

/// The container a controller is attached to.
pub trait RevealHost {
    /// Elements currently rendered that match `selector`, in document order.
    fn query(&self, selector: &str) -> Vec<ElementId>;
    fn add_class(&self, element: ElementId, class: &str);
}

#[derive(Clone, Debug)]
pub struct RevealOptions {
    pub selector: String,
    pub class: String,
    /// Visible fraction of an element that counts as crossing.
    pub threshold: f64,
    /// Distance in px outside the viewport that also counts as crossing.
    pub root_margin: f64,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl Default for RevealOptions {
    fn default() -> Self {
        RevealOptions {
            selector: ".animate-on-scroll".to_string(),
            class: "is-visible".to_string(),
            threshold: 0.15,
            root_margin: 0.0,
            retry_delay: Duration::from_millis(50),
            max_retries: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityEntry {
    pub target: ElementId,
    /// Fraction of the element inside the viewport, 0.0..=1.0.
    pub ratio: f64,
    /// Distance to the nearest viewport edge when fully outside, else 0.
    pub gap: f64,
}

impl VisibilityEntry {
    fn crosses(&self, options: &RevealOptions) -> bool {
        if self.ratio > 0.0 && self.ratio >= options.threshold {
            return true;
        }
        options.root_margin > 0.0 && self.gap <= options.root_margin
    }
}

/// Vertical box of a rendered element, in px from the top of the page.
#[derive(Clone, Copy, Debug)]
pub struct ElementBox {
    pub id: ElementId,
    pub top: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub scroll_top: f64,
    pub height: f64,
}

impl Viewport {
    pub fn entries(&self, boxes: &[ElementBox]) -> Vec<VisibilityEntry> {
        let view_bottom = self.scroll_top + self.height;
        boxes
            .iter()
            .map(|element| {
                let bottom = element.top + element.height;
                let overlap = (bottom.min(view_bottom) - element.top.max(self.scroll_top)).max(0.0);
                let ratio = if element.height > 0.0 {
                    (overlap / element.height).min(1.0)
                } else if element.top >= self.scroll_top && element.top <= view_bottom {
                    1.0
                } else {
                    0.0
                };
                let gap = if element.top > view_bottom {
                    element.top - view_bottom
                } else if bottom < self.scroll_top {
                    self.scroll_top - bottom
                } else {
                    0.0
                };
                VisibilityEntry {
                    target: element.id,
                    ratio,
                    gap,
                }
            })
            .collect()
    }
}

#[derive(Default)]
struct Observer {
    observed: HashSet<ElementId>,
}

struct Inner<H> {
    host: Rc<H>,
    options: RevealOptions,
    observer: Option<Observer>,
    revealed: HashSet<ElementId>,
    pending: Option<JoinHandle<()>>,
    retries: u32,
    torn_down: bool,
}

pub struct RevealController<H: RevealHost + 'static> {
    inner: Rc<RefCell<Inner<H>>>,
}

impl<H: RevealHost + 'static> RevealController<H> {
    pub fn new(host: Rc<H>, options: RevealOptions) -> Self {
        RevealController {
            inner: Rc::new(RefCell::new(Inner {
                host,
                options,
                observer: None,
                revealed: HashSet::new(),
                pending: None,
                retries: 0,
                torn_down: false,
            })),
        }
    }

    /// Creates the observer if needed and observes every revealable element
    /// rendered so far. When nothing is rendered yet, discovery is retried on
    /// a timer, which needs a running local task set.
    pub fn activate(&self) {
        {
            let mut state = self.inner.borrow_mut();
            if state.torn_down {
                return;
            }
            state.observer.get_or_insert_with(Observer::default);
        }
        discover(&self.inner);
    }

    /// Feeds visibility changes in; returns how many elements were revealed.
    pub fn on_visibility(&self, entries: &[VisibilityEntry]) -> usize {
        let mut state = self.inner.borrow_mut();
        let Inner {
            host,
            options,
            observer,
            revealed,
            ..
        } = &mut *state;
        let Some(observer) = observer else {
            return 0;
        };
        let mut count = 0;
        for entry in entries {
            if observer.observed.contains(&entry.target) && entry.crosses(options) {
                host.add_class(entry.target, &options.class);
                observer.observed.remove(&entry.target);
                revealed.insert(entry.target);
                count += 1;
            }
        }
        count
    }

    pub fn teardown(&self) {
        let mut state = self.inner.borrow_mut();
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        if state.observer.take().is_some() {
            tracing::debug!(revealed = state.revealed.len(), "Reveal observer disconnected");
        }
        state.torn_down = true;
    }

    pub fn is_revealed(&self, element: ElementId) -> bool {
        self.inner.borrow().revealed.contains(&element)
    }

    pub fn observed_count(&self) -> usize {
        self.inner
            .borrow()
            .observer
            .as_ref()
            .map_or(0, |observer| observer.observed.len())
    }

    pub fn has_pending_retry(&self) -> bool {
        self.inner.borrow().pending.is_some()
    }
}

impl<H: RevealHost + 'static> Drop for RevealController<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn discover<H: RevealHost + 'static>(inner: &Rc<RefCell<Inner<H>>>) {
    let mut state = inner.borrow_mut();
    if state.torn_down {
        return;
    }
    let elements = state.host.query(&state.options.selector);
    if elements.is_empty() {
        if state.retries >= state.options.max_retries {
            tracing::debug!(
                selector = %state.options.selector,
                retries = state.retries,
                "No revealable elements, giving up"
            );
            return;
        }
        state.retries += 1;
        let delay = state.options.retry_delay;
        let weak = Rc::downgrade(inner);
        if let Some(previous) = state.pending.take() {
            previous.abort();
        }
        state.pending = Some(rt::spawn(retry_discovery(weak, delay)));
        return;
    }

    let Inner {
        observer, revealed, ..
    } = &mut *state;
    if let Some(observer) = observer {
        observer.observed.extend(
            elements
                .into_iter()
                .filter(|element| !revealed.contains(element)),
        );
    }
}

async fn retry_discovery<H: RevealHost + 'static>(inner: Weak<RefCell<Inner<H>>>, delay: Duration) {
    tokio::time::sleep(delay).await;
    if let Some(inner) = inner.upgrade() {
        inner.borrow_mut().pending = None;
        discover(&inner);
    }
}
