//! Shared POI handle with synchronous change notification
//!
//! Single-threaded: handles are `Rc`-based and listeners run on the calling
//! thread before the mutating call returns. Every mutation releases its
//! interior borrow before listeners run, so a listener may read, mutate or
//! reset the same POI.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::body::BodyRef;
use crate::color::Color;
use crate::error::PoiError;

use super::entity::PoiEntity;
use super::kind::{PoiEdit, PoiEvent, PoiType};
use super::resettable::{ResettablePoi, SealState};

static NEXT_POI_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Stable per-instance identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoiId(u64);

impl fmt::Display for PoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "poi#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type PoiListener = Rc<dyn Fn(&SharedPoi, PoiEvent)>;

struct Inner {
    id: PoiId,
    poi: RefCell<ResettablePoi>,
    listeners: RefCell<Vec<(ListenerId, PoiListener)>>,
}

#[derive(Clone)]
pub struct SharedPoi(Rc<Inner>);

impl SharedPoi {
    pub fn new(poi: ResettablePoi) -> Self {
        Self(Rc::new(Inner {
            id: PoiId(NEXT_POI_ID.fetch_add(1, Ordering::Relaxed)),
            poi: RefCell::new(poi),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    /// Unsealed handle, used for overrides
    pub fn plain(entity: &PoiEntity) -> Self {
        Self::new(ResettablePoi::new(entity, false))
    }

    /// Sealed handle, used for live defaults
    pub fn sealed(entity: &PoiEntity) -> Self {
        Self::new(ResettablePoi::new(entity, true))
    }

    pub fn id(&self) -> PoiId {
        self.0.id
    }

    pub fn ptr_eq(&self, other: &SharedPoi) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Copy of the current values
    pub fn entity(&self) -> PoiEntity {
        self.0.poi.borrow().entity().clone()
    }

    /// Read the current values without copying
    pub fn with<R>(&self, f: impl FnOnce(&PoiEntity) -> R) -> R {
        f(self.0.poi.borrow().entity())
    }

    pub fn poi_type(&self) -> PoiType {
        self.with(|p| p.poi_type())
    }

    pub fn body(&self) -> Option<BodyRef> {
        self.with(|p| p.body().cloned())
    }

    pub fn enabled(&self) -> bool {
        self.with(|p| p.enabled())
    }

    pub fn radius(&self) -> f64 {
        self.with(|p| p.radius())
    }

    pub fn state(&self) -> SealState {
        self.0.poi.borrow().state()
    }

    pub fn is_sealed(&self) -> bool {
        self.0.poi.borrow().is_sealed()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.poi.borrow().is_dirty()
    }

    /// Register a listener; listeners run in subscription order
    ///
    /// Events are hints, not snapshots. An earlier listener may mutate or
    /// reset the POI before a later one sees the event, so a later listener
    /// can receive the restoring `Changed` events of a nested reset before the
    /// `Dirtied` that triggered it, and then see `Dirtied` on a POI that is
    /// already clean. Read the live value instead of inferring it from the
    /// event sequence.
    pub fn subscribe(&self, listener: PoiListener) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.0.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.0.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn edit(&self, edit: PoiEdit) -> Result<(), PoiError> {
        let events = self.0.poi.borrow_mut().apply(edit)?;
        self.notify(&events);
        Ok(())
    }

    pub fn set_label(&self, label: Option<String>) -> Result<(), PoiError> {
        self.edit(PoiEdit::Label(label))
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), PoiError> {
        self.edit(PoiEdit::Enabled(enabled))
    }

    pub fn set_radius(&self, radius: f64) -> Result<(), PoiError> {
        self.edit(PoiEdit::Radius(radius))
    }

    pub fn set_color(&self, color: Color) -> Result<(), PoiError> {
        self.edit(PoiEdit::Color(color))
    }

    pub fn set_add_planet_radius(&self, add: bool) -> Result<(), PoiError> {
        self.edit(PoiEdit::AddPlanetRadius(add))
    }

    pub fn set_line_width(&self, width: f32) -> Result<(), PoiError> {
        self.edit(PoiEdit::LineWidth(width))
    }

    pub fn set_resolution(&self, resolution: u32) -> Result<(), PoiError> {
        self.edit(PoiEdit::Resolution(resolution))
    }

    /// Restore the sealed snapshot, notifying listeners attribute by
    /// attribute. Returns whether anything was restored.
    pub fn reset(&self) -> Result<bool, PoiError> {
        let Some(edits) = self.0.poi.borrow_mut().begin_reset()? else {
            return Ok(false);
        };
        let mut outcome = Ok(true);
        for edit in edits {
            let applied = self.0.poi.borrow_mut().apply(edit);
            match applied {
                Ok(events) => self.notify(&events),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        self.0.poi.borrow_mut().finish_reset();
        outcome
    }

    pub fn save(&self) -> Result<bool, PoiError> {
        self.0.poi.borrow_mut().save()
    }

    /// Dispatch event by event to the listeners registered when the mutation
    /// started; nested mutations dispatch their own events inline.
    fn notify(&self, events: &[PoiEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<PoiListener> = self
            .0
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for event in events {
            for listener in &listeners {
                listener(self, *event);
            }
        }
    }
}

impl fmt::Debug for SharedPoi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("SharedPoi");
        debug.field("id", &self.0.id);
        match self.0.poi.try_borrow() {
            Ok(poi) => debug.field("poi", poi.entity()).field("state", &poi.state()),
            Err(_) => debug.field("poi", &"<borrowed>"),
        };
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyRegistry;
    use crate::poi::PoiAttribute;
    use std::cell::Cell;

    fn sealed_atmosphere() -> SharedPoi {
        let registry = BodyRegistry::empty();
        SharedPoi::sealed(&PoiEntity::default_from(PoiType::Atmosphere, None, &registry))
    }

    fn recorder(poi: &SharedPoi) -> Rc<RefCell<Vec<PoiEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        poi.subscribe(Rc::new(move |_, event| sink.borrow_mut().push(event)));
        log
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(sealed_atmosphere().id(), sealed_atmosphere().id());
    }

    #[test]
    fn test_edit_notifies_changed_attributes() {
        let poi = sealed_atmosphere();
        let log = recorder(&poi);
        poi.set_radius(10.0).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                PoiEvent::Changed(PoiAttribute::Radius),
                PoiEvent::Changed(PoiAttribute::Diameter),
                PoiEvent::Dirtied,
            ]
        );
    }

    #[test]
    fn test_noop_edit_is_silent() {
        let poi = sealed_atmosphere();
        let log = recorder(&poi);
        poi.set_enabled(true).unwrap();
        assert!(log.borrow().is_empty());
        assert!(!poi.reset().unwrap());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_toggle_then_reset_dirties_exactly_once() {
        let poi = sealed_atmosphere();
        let log = recorder(&poi);
        let dirtied_during_reset = Rc::new(Cell::new(0));
        {
            let counter = dirtied_during_reset.clone();
            poi.subscribe(Rc::new(move |poi, event| {
                if event == PoiEvent::Dirtied && poi.state() == SealState::Resetting {
                    counter.set(counter.get() + 1);
                }
            }));
        }

        poi.set_enabled(false).unwrap();
        assert!(poi.reset().unwrap());

        let dirtied = log.borrow().iter().filter(|e| **e == PoiEvent::Dirtied).count();
        assert_eq!(dirtied, 1);
        assert_eq!(dirtied_during_reset.get(), 0);
        assert!(poi.enabled());
        assert_eq!(poi.state(), SealState::Clean);
    }

    #[test]
    fn test_listener_may_reset_reentrantly() {
        let poi = sealed_atmosphere();
        let nested_errors = Rc::new(Cell::new(0));
        {
            let errors = nested_errors.clone();
            poi.subscribe(Rc::new(move |poi, event| match event {
                PoiEvent::Dirtied => {
                    poi.reset().unwrap();
                }
                PoiEvent::Changed(_) if poi.state() == SealState::Resetting => {
                    if poi.reset().is_err() {
                        errors.set(errors.get() + 1);
                    }
                }
                PoiEvent::Changed(_) => {}
            }));
        }

        poi.set_enabled(false).unwrap();
        assert!(poi.enabled());
        assert!(!poi.is_dirty());
        // The restore of `enabled` fired once inside the reset
        assert_eq!(nested_errors.get(), 1);
    }

    #[test]
    fn test_later_listener_sees_nested_reset_first() {
        let poi = sealed_atmosphere();
        poi.subscribe(Rc::new(|poi, event| {
            if event == PoiEvent::Dirtied {
                poi.reset().unwrap();
            }
        }));
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let sink = seen.clone();
            poi.subscribe(Rc::new(move |poi, event| sink.borrow_mut().push((event, poi.state()))));
        }

        poi.set_enabled(false).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                (PoiEvent::Changed(PoiAttribute::Enabled), SealState::Dirty),
                (PoiEvent::Changed(PoiAttribute::Enabled), SealState::Resetting),
                (PoiEvent::Dirtied, SealState::Clean),
            ]
        );
        assert!(poi.enabled());
    }

    #[test]
    fn test_unsubscribe() {
        let poi = sealed_atmosphere();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let id = poi.subscribe(Rc::new(move |_, _| counter.set(counter.get() + 1)));
        poi.set_line_width(2.0).unwrap();
        assert!(poi.unsubscribe(id));
        poi.set_line_width(3.0).unwrap();
        assert_eq!(hits.get(), 2);
        assert!(!poi.unsubscribe(id));
    }
}
