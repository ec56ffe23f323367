//! Declarative attribute-change propagation
//!
//! A `ChangePropagator` is a table from a closed attribute enum to a
//! `Mapping`: an optional accessor pair that copies the source's current value
//! into a target, and an optional zero-argument action. The table is declared
//! once through an exhaustive `match`, so adding an attribute variant forces a
//! decision about its propagation at compile time. The copy always runs before
//! the action.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::poi::PoiAttribute;

/// Closed set of attribute names a propagator can be keyed by
pub trait Attribute: Copy + Eq + Hash + fmt::Debug + 'static {
    fn all() -> &'static [Self];
}

impl Attribute for PoiAttribute {
    fn all() -> &'static [Self] {
        &PoiAttribute::ALL
    }
}

type CopyFn<S, T> = Box<dyn Fn(&S, &mut T)>;

pub struct Mapping<S, T> {
    copy: Option<CopyFn<S, T>>,
    action: Option<Rc<dyn Fn()>>,
}

impl<S: 'static, T: 'static> Mapping<S, T> {
    /// Copy `get(source)` into the target through `set`
    pub fn bind<V, G, P>(get: G, set: P) -> Self
    where
        G: Fn(&S) -> V + 'static,
        P: Fn(&mut T, V) + 'static,
    {
        Self {
            copy: Some(Box::new(move |source: &S, target: &mut T| set(target, get(source)))),
            action: None,
        }
    }

    /// Only run a side effect
    pub fn action(action: impl Fn() + 'static) -> Self {
        Self {
            copy: None,
            action: Some(Rc::new(action)),
        }
    }

    /// Add a side effect that runs after the copy
    pub fn then(mut self, action: impl Fn() + 'static) -> Self {
        self.action = Some(Rc::new(action));
        self
    }
}

pub struct ChangePropagator<A, S, T> {
    table: HashMap<A, Mapping<S, T>>,
}

impl<A: Attribute, S, T> ChangePropagator<A, S, T> {
    /// Build the table by asking `declare` about every attribute once
    pub fn from_fn(mut declare: impl FnMut(A) -> Option<Mapping<S, T>>) -> Self {
        let table = A::all()
            .iter()
            .filter_map(|attribute| declare(*attribute).map(|mapping| (*attribute, mapping)))
            .collect();
        Self { table }
    }

    pub fn is_mapped(&self, attribute: A) -> bool {
        self.table.contains_key(&attribute)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Dispatch one change. Unmapped attributes are ignored and report `false`.
    pub fn process(&self, source: &S, target: &mut T, attribute: A) -> bool {
        let Some(mapping) = self.table.get(&attribute) else {
            return false;
        };
        if let Some(copy) = &mapping.copy {
            copy(source, target);
        }
        if let Some(action) = &mapping.action {
            action();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Field {
        Width,
        Height,
        Title,
    }

    impl Attribute for Field {
        fn all() -> &'static [Self] {
            &[Field::Width, Field::Height, Field::Title]
        }
    }

    struct Source {
        width: u32,
        title: String,
    }

    #[derive(Default)]
    struct Target {
        width: u32,
        caption: String,
    }

    #[test]
    fn test_copy_and_action() {
        let relayouts = Rc::new(Cell::new(0));
        let counter = relayouts.clone();
        let propagator: ChangePropagator<Field, Source, Target> =
            ChangePropagator::from_fn(move |field| match field {
                Field::Width => {
                    let counter = counter.clone();
                    Some(
                        Mapping::bind(|s: &Source| s.width, |t: &mut Target, v| t.width = v)
                            .then(move || counter.set(counter.get() + 1)),
                    )
                }
                Field::Title => Some(Mapping::bind(
                    |s: &Source| s.title.clone(),
                    |t: &mut Target, v| t.caption = v,
                )),
                Field::Height => None,
            });

        let source = Source { width: 640, title: "Kerbin".to_string() };
        let mut target = Target::default();

        assert!(propagator.process(&source, &mut target, Field::Width));
        assert_eq!(target.width, 640);
        assert_eq!(relayouts.get(), 1);

        assert!(propagator.process(&source, &mut target, Field::Title));
        assert_eq!(target.caption, "Kerbin");

        assert!(!propagator.process(&source, &mut target, Field::Height));
        assert_eq!(propagator.len(), 2);
    }

    #[test]
    fn test_copy_runs_before_action() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let in_copy = order.clone();
        let in_action = order.clone();
        let propagator: ChangePropagator<Field, Source, Target> =
            ChangePropagator::from_fn(move |field| {
                let in_copy = in_copy.clone();
                let in_action = in_action.clone();
                (field == Field::Width).then(|| {
                    Mapping::bind(
                        move |s: &Source| {
                            in_copy.borrow_mut().push("copy");
                            s.width
                        },
                        |t: &mut Target, v| t.width = v,
                    )
                    .then(move || in_action.borrow_mut().push("action"))
                })
            });

        let source = Source { width: 1, title: String::new() };
        propagator.process(&source, &mut Target::default(), Field::Width);
        assert_eq!(*order.borrow(), vec!["copy", "action"]);
    }

    #[test]
    fn test_action_only_mapping() {
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let propagator: ChangePropagator<Field, Source, Target> =
            ChangePropagator::from_fn(move |field| {
                let flag = flag.clone();
                (field == Field::Height).then(|| Mapping::action(move || flag.set(true)))
            });
        let source = Source { width: 1, title: String::new() };
        let mut target = Target::default();
        assert!(propagator.process(&source, &mut target, Field::Height));
        assert!(fired.get());
        assert_eq!(target.width, 0);
    }
}
