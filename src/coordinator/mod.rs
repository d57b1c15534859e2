//! # Scene Coordinator
//!
//! All view-to-view transitions go through the coordinator so application
//! logic never touches the display tree directly. A scene is whatever the
//! application says it is (typically a closed enum), and a
//! [`SceneCreator`] turns scenes into displayable units. The coordinator
//! owns the window, applies the wrap rule, and hands back a one-shot
//! [`Completion`] per transition.
//!
//! The coordinator assumes the UI context throughout: no cross-thread
//! dispatch, no locking. Concurrent pushes on one stack are serialized by
//! the stack itself.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::completion::Completion;
use crate::host::{Unit, ViewHandle, Window};

/// Builds the displayable unit for a scene. The coordinator reference
/// lets created units trigger further navigation.
pub trait SceneCreator<S> {
    fn create_unit(&self, scene: &S, coordinator: &Rc<SceneCoordinator<S>>) -> Box<dyn Unit>;
}

/// A requested transition, dispatched by [`SceneCoordinator::perform`].
pub enum NavigationAction<S> {
    Pop,
    Dismiss,
    Push(S),
    Present(S),
    ChangeRoot(S),
}

/// The two ways a transition can fail. Everything else either succeeds
/// or is the host's problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Push attempted from a view that is not embedded in a navigation
    /// stack.
    NoNavigationStack,
    /// Pop attempted with no stack, or with the stack already at its root.
    PopNotPossible,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::NoNavigationStack => {
                write!(f, "no navigation stack available for push")
            }
            TransitionError::PopNotPossible => write!(f, "pop not possible"),
        }
    }
}

impl std::error::Error for TransitionError {}

/// Wraps a plain view in a navigation context; swap it to use a custom
/// stack container.
pub type StackFactory = Box<dyn Fn(ViewHandle) -> ViewHandle>;

pub struct SceneCoordinator<S> {
    window: Rc<RefCell<Window>>,
    creator: Box<dyn SceneCreator<S>>,
    stack_factory: StackFactory,
}

impl<S> SceneCoordinator<S> {
    /// Install `initial_scene` as the window's root (wrapped per the wrap
    /// rule) and make the window visible.
    pub fn new(
        window: Rc<RefCell<Window>>,
        initial_scene: &S,
        creator: Box<dyn SceneCreator<S>>,
    ) -> Rc<Self> {
        Self::with_stack_factory(window, initial_scene, creator, Box::new(ViewHandle::stack))
    }

    /// Like [`SceneCoordinator::new`] but with a custom navigation-stack
    /// wrapper.
    pub fn with_stack_factory(
        window: Rc<RefCell<Window>>,
        initial_scene: &S,
        creator: Box<dyn SceneCreator<S>>,
        stack_factory: StackFactory,
    ) -> Rc<Self> {
        let coordinator = Rc::new(Self {
            window,
            creator,
            stack_factory,
        });
        let root = coordinator.view_for(initial_scene, true);
        {
            let mut window = coordinator.window.borrow_mut();
            window.set_root(root);
            window.make_visible();
        }
        coordinator
    }

    /// Build the view for a scene. With `wrap_in_stack`, units that do
    /// not already self-identify as navigation containers are embedded in
    /// a fresh stack.
    pub fn view_for(self: &Rc<Self>, scene: &S, wrap_in_stack: bool) -> ViewHandle {
        let view = ViewHandle::plain(self.creator.create_unit(scene, self));
        if wrap_in_stack {
            self.wrapped(view)
        } else {
            view
        }
    }

    fn wrapped(&self, view: ViewHandle) -> ViewHandle {
        if view.is_navigation_container() {
            return view;
        }
        (self.stack_factory)(view)
    }

    /// Dispatch a navigation action from `from`.
    pub fn perform(
        self: &Rc<Self>,
        action: NavigationAction<S>,
        from: &ViewHandle,
        animated: bool,
    ) -> Completion<TransitionError> {
        match action {
            NavigationAction::Pop => self.pop(from, animated),
            NavigationAction::Dismiss => self.dismiss(from, animated),
            NavigationAction::Push(scene) => self.push(&scene, from, animated),
            NavigationAction::Present(scene) => self.present(&scene, from, animated),
            NavigationAction::ChangeRoot(scene) => self.change_root(&scene, animated),
        }
    }

    /// Push a scene onto the stack enclosing `from`. Fails with
    /// [`TransitionError::NoNavigationStack`] when `from` is not embedded
    /// in one; no container is touched in that case. Completes when the
    /// stack reports the push transition finished.
    pub fn push(
        self: &Rc<Self>,
        scene: &S,
        from: &ViewHandle,
        _animated: bool,
    ) -> Completion<TransitionError> {
        let next = self.view_for(scene, false);
        let Some(stack) = from.navigation_stack() else {
            return Completion::resolved(Err(TransitionError::NoNavigationStack));
        };
        debug!("push onto stack at depth {}", stack.depth());
        let (source, completion) = Completion::pending();
        stack.observe_did_show(Box::new(move || source.resolve(Ok(()))));
        stack.push_view(next);
        completion
    }

    /// Present a scene modally over `from`, wrapped per the wrap rule.
    /// Completes on the host's presentation callback.
    pub fn present(
        self: &Rc<Self>,
        scene: &S,
        from: &ViewHandle,
        animated: bool,
    ) -> Completion<TransitionError> {
        let next = self.view_for(scene, true);
        let (source, completion) = Completion::pending();
        from.present(next, animated, move || source.resolve(Ok(())));
        completion
    }

    /// Swap the window's root to a scene. Animated with a prior root,
    /// the old root stays visible as a fading snapshot for the fade
    /// duration and the completion fires when the swap lands; otherwise
    /// the swap is synchronous and the completion is already resolved.
    pub fn change_root(self: &Rc<Self>, scene: &S, animated: bool) -> Completion<TransitionError> {
        let next = self.view_for(scene, true);
        let mut window = self.window.borrow_mut();
        if animated {
            let (source, completion) = Completion::pending();
            if window.begin_root_fade(next.clone(), Box::new(move || source.resolve(Ok(())))) {
                return completion;
            }
            // No prior root (or nothing rendered yet): fall through to
            // the synchronous swap. The pending source drops unresolved;
            // the caller gets a fresh resolved completion instead.
        }
        info!("root changed");
        window.set_root(next);
        Completion::resolved(Ok(()))
    }

    /// Pop the view above `from`'s stack root. Fails with
    /// [`TransitionError::PopNotPossible`] when there is no stack or the
    /// stack is already at its root. Completes when the stack reports the
    /// pop transition finished.
    pub fn pop(self: &Rc<Self>, from: &ViewHandle, _animated: bool) -> Completion<TransitionError> {
        let Some(stack) = from.navigation_stack() else {
            return Completion::resolved(Err(TransitionError::PopNotPossible));
        };
        if !stack.can_pop() {
            return Completion::resolved(Err(TransitionError::PopNotPossible));
        }
        let (source, completion) = Completion::pending();
        stack.observe_did_show(Box::new(move || source.resolve(Ok(()))));
        stack.pop_view();
        completion
    }

    /// Dismiss `from`'s presented view. Completes on the host's
    /// dismissal callback.
    pub fn dismiss(
        self: &Rc<Self>,
        from: &ViewHandle,
        animated: bool,
    ) -> Completion<TransitionError> {
        let (source, completion) = Completion::pending();
        from.dismiss(animated, move || source.resolve(Ok(())));
        completion
    }

    /// The window this coordinator drives.
    pub fn window(&self) -> Rc<RefCell<Window>> {
        self.window.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::buffer::Buffer;
    use ratatui::layout::Rect;

    /// Test scenes for the coordinator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Scene {
        Home,
        Detail,
    }

    struct Blank;

    impl Unit for Blank {
        fn render(&mut self, _area: Rect, _buf: &mut Buffer) {}
    }

    /// A unit that claims to already be a navigation container.
    struct Container;

    impl Unit for Container {
        fn render(&mut self, _area: Rect, _buf: &mut Buffer) {}
        fn is_navigation_container(&self) -> bool {
            true
        }
    }

    struct Creator;

    impl SceneCreator<Scene> for Creator {
        fn create_unit(
            &self,
            _scene: &Scene,
            _coordinator: &Rc<SceneCoordinator<Scene>>,
        ) -> Box<dyn Unit> {
            Box::new(Blank)
        }
    }

    struct ContainerCreator;

    impl SceneCreator<Scene> for ContainerCreator {
        fn create_unit(
            &self,
            _scene: &Scene,
            _coordinator: &Rc<SceneCoordinator<Scene>>,
        ) -> Box<dyn Unit> {
            Box::new(Container)
        }
    }

    fn coordinator() -> Rc<SceneCoordinator<Scene>> {
        SceneCoordinator::new(
            Rc::new(RefCell::new(Window::new())),
            &Scene::Home,
            Box::new(Creator),
        )
    }

    #[test]
    fn test_initial_scene_installed_wrapped_and_visible() {
        let coordinator = coordinator();
        let window = coordinator.window();
        let window = window.borrow();
        assert!(window.is_visible());
        let root = window.root().expect("root installed");
        assert!(root.is_navigation_container(), "initial root is wrapped");
        assert_eq!(root.depth(), 1);
    }

    #[test]
    fn test_wrap_rule_skips_self_identified_containers() {
        let coordinator = SceneCoordinator::new(
            Rc::new(RefCell::new(Window::new())),
            &Scene::Home,
            Box::new(ContainerCreator),
        );
        let view = coordinator.view_for(&Scene::Detail, true);
        // Already a container: no stack added around it.
        assert_eq!(view.depth(), 0);
        assert!(view.is_navigation_container());
    }

    #[test]
    fn test_push_completes_through_did_show() {
        let coordinator = coordinator();
        let root = coordinator.window().borrow().root().unwrap();
        let top = root.top().unwrap();

        let mut completion = coordinator.push(&Scene::Detail, &top, true);
        assert_eq!(completion.try_wait(), Some(Ok(())));
        assert_eq!(root.depth(), 2);
    }

    #[test]
    fn test_push_without_stack_fails_and_mutates_nothing() {
        let coordinator = coordinator();
        let root = coordinator.window().borrow().root().unwrap();
        let orphan = ViewHandle::plain(Box::new(Blank));

        let mut completion = coordinator.push(&Scene::Detail, &orphan, true);
        assert_eq!(
            completion.try_wait(),
            Some(Err(TransitionError::NoNavigationStack))
        );
        assert_eq!(root.depth(), 1, "no container mutated");
    }

    #[test]
    fn test_pop_at_root_fails() {
        let coordinator = coordinator();
        let root = coordinator.window().borrow().root().unwrap();
        let top = root.top().unwrap();

        let mut completion = coordinator.pop(&top, true);
        assert_eq!(
            completion.try_wait(),
            Some(Err(TransitionError::PopNotPossible))
        );
    }

    #[test]
    fn test_pop_without_stack_fails() {
        let coordinator = coordinator();
        let orphan = ViewHandle::plain(Box::new(Blank));
        let mut completion = coordinator.pop(&orphan, false);
        assert_eq!(
            completion.try_wait(),
            Some(Err(TransitionError::PopNotPossible))
        );
    }

    #[test]
    fn test_push_then_pop_round_trip() {
        let coordinator = coordinator();
        let root = coordinator.window().borrow().root().unwrap();
        let home = root.top().unwrap();

        coordinator.push(&Scene::Detail, &home, false);
        let detail = root.top().unwrap();
        assert!(!detail.same_view(&home));

        let mut completion = coordinator.pop(&detail, false);
        assert_eq!(completion.try_wait(), Some(Ok(())));
        assert!(root.top().unwrap().same_view(&home));
    }

    #[test]
    fn test_present_and_dismiss_complete() {
        let coordinator = coordinator();
        let root = coordinator.window().borrow().root().unwrap();
        let home = root.top().unwrap();

        let mut completion = coordinator.present(&Scene::Detail, &home, true);
        assert_eq!(completion.try_wait(), Some(Ok(())));
        let modal = home.presented().expect("modal attached");
        assert!(modal.is_navigation_container(), "presented unit is wrapped");

        let mut completion = coordinator.dismiss(&home, true);
        assert_eq!(completion.try_wait(), Some(Ok(())));
        assert!(home.presented().is_none());
    }

    #[test]
    fn test_change_root_unanimated_is_synchronous() {
        let coordinator = coordinator();
        let window = coordinator.window();
        let old_root = window.borrow().root().unwrap();

        let mut completion = coordinator.change_root(&Scene::Detail, false);
        assert_eq!(completion.try_wait(), Some(Ok(())), "no run-loop tick needed");
        let new_root = window.borrow().root().unwrap();
        assert!(!new_root.same_view(&old_root));
    }

    #[test]
    fn test_change_root_animated_waits_for_fade() {
        use std::time::Instant;

        use crate::host::ROOT_FADE;

        let coordinator = coordinator();
        let window = coordinator.window();
        let old_root = window.borrow().root().unwrap();

        // Render once so the window has an area to snapshot.
        let area = Rect::new(0, 0, 8, 4);
        let mut buf = Buffer::empty(area);
        window.borrow_mut().render(area, &mut buf);

        let mut completion = coordinator.change_root(&Scene::Detail, true);
        assert_eq!(completion.try_wait(), None, "completion waits for the fade");
        assert!(window.borrow().fading());
        assert!(
            window.borrow().root().unwrap().same_view(&old_root),
            "old root retained until the fade completes"
        );

        window.borrow_mut().tick(Instant::now() + ROOT_FADE);
        assert_eq!(completion.try_wait(), Some(Ok(())));
        assert!(!window.borrow().root().unwrap().same_view(&old_root));
    }

    #[test]
    fn test_change_root_animated_without_render_falls_back() {
        let coordinator = coordinator();
        // Window never rendered: animation impossible, swap is immediate.
        let mut completion = coordinator.change_root(&Scene::Detail, true);
        assert_eq!(completion.try_wait(), Some(Ok(())));
    }

    #[test]
    fn test_perform_dispatches_each_action() {
        let coordinator = coordinator();
        let root = coordinator.window().borrow().root().unwrap();
        let home = root.top().unwrap();

        let mut push = coordinator.perform(NavigationAction::Push(Scene::Detail), &home, false);
        assert_eq!(push.try_wait(), Some(Ok(())));

        let top = root.top().unwrap();
        let mut pop = coordinator.perform(NavigationAction::Pop, &top, false);
        assert_eq!(pop.try_wait(), Some(Ok(())));

        let mut present =
            coordinator.perform(NavigationAction::Present(Scene::Detail), &home, false);
        assert_eq!(present.try_wait(), Some(Ok(())));

        let mut dismiss = coordinator.perform(NavigationAction::Dismiss, &home, false);
        assert_eq!(dismiss.try_wait(), Some(Ok(())));

        let mut change =
            coordinator.perform(NavigationAction::ChangeRoot(Scene::Detail), &home, false);
        assert_eq!(change.try_wait(), Some(Ok(())));
    }
}
