//! # Display Host
//!
//! The minimal display substrate the coordinator drives: a tree of view
//! handles under a single [`Window`], with navigation stacks, modal
//! presentation, and a snapshot fade for root swaps.
//!
//! This is the only module that touches ratatui buffers directly. The
//! whole tree is UI-thread-confined: handles are `Rc`, not
//! `Arc`, and there is no locking. Transitions are instantaneous except
//! the root fade, which the event loop advances through [`Window::tick`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use crossterm::event::KeyEvent;
use log::debug;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::widgets::{Clear, Widget};

/// Duration of the root-swap snapshot fade.
pub const ROOT_FADE: Duration = Duration::from_millis(300);

/// A displayable unit: the concrete surface produced for a scene.
///
/// Rendering is buffer-level rather than frame-level so the window can
/// snapshot a unit offscreen during root swaps.
pub trait Unit {
    /// Draw the unit into the given area.
    fn render(&mut self, area: Rect, buf: &mut Buffer);

    /// Units that already provide their own navigation context (tab bars,
    /// split panes, stack containers) return true and are never wrapped
    /// in a fresh navigation stack.
    fn is_navigation_container(&self) -> bool {
        false
    }

    /// Handle a key routed to this unit. Default: ignore.
    fn handle_key(&mut self, _key: KeyEvent) {}
}

/// An ordered stack of views with a single visible top.
///
/// Pushes and pops are serialized by the stack itself: mutation is
/// synchronous and single-threaded, so no two transitions interleave.
pub struct NavigationStack {
    children: Vec<ViewHandle>,
    did_show: Vec<Box<dyn FnOnce()>>,
}

impl NavigationStack {
    fn new(root: ViewHandle) -> Self {
        Self {
            children: vec![root],
            did_show: Vec::new(),
        }
    }
}

enum Content {
    Plain(Box<dyn Unit>),
    Stack(NavigationStack),
}

struct ViewNode {
    content: Content,
    /// The enclosing navigation stack, if this view is embedded in one.
    nav: Option<Weak<RefCell<ViewNode>>>,
    /// Modally presented child, if any.
    presented: Option<ViewHandle>,
}

/// A cloneable reference to a view in the display tree.
#[derive(Clone)]
pub struct ViewHandle(Rc<RefCell<ViewNode>>);

impl ViewHandle {
    /// A view around a plain unit.
    pub fn plain(unit: Box<dyn Unit>) -> ViewHandle {
        ViewHandle(Rc::new(RefCell::new(ViewNode {
            content: Content::Plain(unit),
            nav: None,
            presented: None,
        })))
    }

    /// A fresh navigation stack with `root` as its only child.
    pub fn stack(root: ViewHandle) -> ViewHandle {
        let handle = ViewHandle(Rc::new(RefCell::new(ViewNode {
            content: Content::Stack(NavigationStack::new(root.clone())),
            nav: None,
            presented: None,
        })));
        root.0.borrow_mut().nav = Some(Rc::downgrade(&handle.0));
        handle
    }

    /// Whether this view can host pushed children without wrapping.
    pub fn is_navigation_container(&self) -> bool {
        match &self.0.borrow().content {
            Content::Stack(_) => true,
            Content::Plain(unit) => unit.is_navigation_container(),
        }
    }

    /// The navigation stack this view is embedded in, if any.
    pub fn navigation_stack(&self) -> Option<ViewHandle> {
        self.0
            .borrow()
            .nav
            .as_ref()
            .and_then(Weak::upgrade)
            .map(ViewHandle)
    }

    /// Register a one-shot observer fired at the next completed push or
    /// pop on this stack. Ignored on non-stack views.
    pub fn observe_did_show(&self, observer: Box<dyn FnOnce()>) {
        if let Content::Stack(stack) = &mut self.0.borrow_mut().content {
            stack.did_show.push(observer);
        }
    }

    /// Push a view onto this stack and fire did-show observers.
    /// Ignored on non-stack views.
    pub fn push_view(&self, view: ViewHandle) {
        {
            let mut node = self.0.borrow_mut();
            let Content::Stack(stack) = &mut node.content else {
                return;
            };
            stack.children.push(view.clone());
        }
        view.0.borrow_mut().nav = Some(Rc::downgrade(&self.0));
        self.fire_did_show();
    }

    /// Whether this stack has a view above its root.
    pub fn can_pop(&self) -> bool {
        match &self.0.borrow().content {
            Content::Stack(stack) => stack.children.len() > 1,
            Content::Plain(_) => false,
        }
    }

    /// Pop the top view. `None` if this is not a stack or the stack is
    /// already at its root; on success, fires did-show observers.
    pub fn pop_view(&self) -> Option<ViewHandle> {
        let popped = {
            let mut node = self.0.borrow_mut();
            let Content::Stack(stack) = &mut node.content else {
                return None;
            };
            if stack.children.len() <= 1 {
                return None;
            }
            stack.children.pop()
        };
        let popped = popped?;
        popped.0.borrow_mut().nav = None;
        self.fire_did_show();
        Some(popped)
    }

    /// The visible top of this stack, if this view is a stack.
    pub fn top(&self) -> Option<ViewHandle> {
        match &self.0.borrow().content {
            Content::Stack(stack) => stack.children.last().cloned(),
            Content::Plain(_) => None,
        }
    }

    /// Number of views on this stack (0 for non-stack views).
    pub fn depth(&self) -> usize {
        match &self.0.borrow().content {
            Content::Stack(stack) => stack.children.len(),
            Content::Plain(_) => 0,
        }
    }

    /// Present a view modally over this one; the callback fires when the
    /// presentation transition finishes.
    pub fn present(&self, child: ViewHandle, _animated: bool, on_complete: impl FnOnce()) {
        self.0.borrow_mut().presented = Some(child);
        on_complete();
    }

    /// Dismiss this view's presented child, if any; the callback fires
    /// when the dismissal transition finishes.
    pub fn dismiss(&self, _animated: bool, on_complete: impl FnOnce()) {
        self.0.borrow_mut().presented = None;
        on_complete();
    }

    /// The view currently presented over this one.
    pub fn presented(&self) -> Option<ViewHandle> {
        self.0.borrow().presented.clone()
    }

    /// Two handles referring to the same view.
    pub fn same_view(&self, other: &ViewHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Drained observers run outside the borrow so they may re-enter the
    /// tree.
    fn fire_did_show(&self) {
        let observers = {
            let mut node = self.0.borrow_mut();
            match &mut node.content {
                Content::Stack(stack) => std::mem::take(&mut stack.did_show),
                Content::Plain(_) => Vec::new(),
            }
        };
        for observer in observers {
            observer();
        }
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let top = {
            let mut node = self.0.borrow_mut();
            match &mut node.content {
                Content::Plain(unit) => {
                    unit.render(area, buf);
                    None
                }
                Content::Stack(stack) => stack.children.last().cloned(),
            }
        };
        if let Some(top) = top {
            top.render(area, buf);
        }
    }

    fn handle_key(&self, key: KeyEvent) {
        if let Content::Plain(unit) = &mut self.0.borrow_mut().content {
            unit.handle_key(key);
        }
    }
}

struct RootFade {
    next: ViewHandle,
    snapshot: Buffer,
    started: Instant,
    on_done: Option<Box<dyn FnOnce()>>,
}

/// The root container: holds the current root view and drives the
/// snapshot fade used for animated root swaps.
pub struct Window {
    root: Option<ViewHandle>,
    visible: bool,
    area: Rect,
    fade: Option<RootFade>,
}

impl Window {
    pub fn new() -> Self {
        Self {
            root: None,
            visible: false,
            area: Rect::ZERO,
            fade: None,
        }
    }

    /// Install a new root immediately, discarding any in-flight fade.
    pub fn set_root(&mut self, view: ViewHandle) {
        self.fade = None;
        self.root = Some(view);
    }

    /// Mark the window visible (the initial-scene install does this once).
    pub fn make_visible(&mut self) {
        self.visible = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The currently installed root. During a fade this is still the old
    /// root; the swap happens when the fade completes.
    pub fn root(&self) -> Option<ViewHandle> {
        self.root.clone()
    }

    /// Begin an animated root swap: snapshot the current root, overlay it
    /// on `next`, and fade it out over [`ROOT_FADE`]. Returns false when
    /// there is no current root or nothing has been rendered yet, in
    /// which case the caller should swap synchronously instead.
    pub fn begin_root_fade(&mut self, next: ViewHandle, on_done: Box<dyn FnOnce()>) -> bool {
        let Some(root) = self.root.clone() else {
            return false;
        };
        if self.area.area() == 0 {
            return false;
        }
        let mut snapshot = Buffer::empty(self.area);
        root.render(self.area, &mut snapshot);
        debug!("root fade started over {:?}", ROOT_FADE);
        self.fade = Some(RootFade {
            next,
            snapshot,
            started: Instant::now(),
            on_done: Some(on_done),
        });
        true
    }

    /// Whether a root fade is in flight (the old root is still showing).
    pub fn fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Advance the fade clock. Once the fade has run its course the
    /// stored root reference is swapped, the snapshot discarded, and the
    /// fade's completion callback fired. Returns true when that happened.
    pub fn tick(&mut self, now: Instant) -> bool {
        let done = self
            .fade
            .as_ref()
            .is_some_and(|fade| now.duration_since(fade.started) >= ROOT_FADE);
        if !done {
            return false;
        }
        if let Some(mut fade) = self.fade.take() {
            self.root = Some(fade.next);
            debug!("root fade finished");
            if let Some(on_done) = fade.on_done.take() {
                on_done();
            }
        }
        true
    }

    /// Draw the window: the root (or, mid-fade, the incoming root under
    /// the dimming snapshot of the old one), then any presented chain as
    /// centered modal overlays.
    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        self.area = area;
        if let Some(fade) = &self.fade {
            fade.next.render(area, buf);
            let progress = fade.started.elapsed().as_secs_f32() / ROOT_FADE.as_secs_f32();
            overlay_snapshot(&fade.snapshot, buf, progress);
            return;
        }
        let Some(root) = self.root.clone() else {
            return;
        };
        root.render(area, buf);
        for modal in presented_chain(&root) {
            let overlay = modal_area(area);
            Clear.render(overlay, buf);
            modal.render(overlay, buf);
        }
    }

    /// Route a key to the topmost presented unit, else the active stack
    /// top, else the root.
    pub fn dispatch_key(&mut self, key: KeyEvent) {
        let Some(root) = self.root.clone() else {
            return;
        };
        key_target(root).handle_key(key);
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy the snapshot over `buf`, dimming it through the back half of the
/// fade. Terminal cells have no alpha, so dim stands in for it.
fn overlay_snapshot(snapshot: &Buffer, buf: &mut Buffer, progress: f32) {
    let area = snapshot.area.intersection(buf.area);
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            let Some(cell) = snapshot.cell((x, y)) else {
                continue;
            };
            let Some(target) = buf.cell_mut((x, y)) else {
                continue;
            };
            *target = cell.clone();
            if progress > 0.5 {
                target.modifier.insert(Modifier::DIM);
            }
        }
    }
}

/// Walk presented children from the root outward, descending through
/// stack tops, and collect them in presentation order.
fn presented_chain(root: &ViewHandle) -> Vec<ViewHandle> {
    let mut chain = Vec::new();
    let mut current = root.clone();
    loop {
        if let Some(presented) = current.presented() {
            chain.push(presented.clone());
            current = presented;
            continue;
        }
        if let Some(top) = current.top() {
            current = top;
            continue;
        }
        break;
    }
    chain
}

/// The unit that should receive keys: deepest presented view, then the
/// visible stack top.
fn key_target(root: ViewHandle) -> ViewHandle {
    let mut current = root;
    loop {
        if let Some(presented) = current.presented() {
            current = presented;
            continue;
        }
        if let Some(top) = current.top() {
            current = top;
            continue;
        }
        return current;
    }
}

/// Centered overlay covering most of the area, the usual modal footprint.
fn modal_area(area: Rect) -> Rect {
    let width = (area.width as u32 * 4 / 5) as u16;
    let height = (area.height as u32 * 4 / 5) as u16;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
