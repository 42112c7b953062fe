use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use derive_builder::Builder;

use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::parking::LaneChange;
use crate::simulation::vehicles::SimVehicle;

pub trait EventTrait: Debug + Any {
    // This can't be a const, because traits with const fields are not dyn compatible.
    fn type_(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn time(&self) -> u32;
}

type OnEventFn = dyn Fn(&dyn EventTrait) + 'static;

/// The EventsManager holds call-backs for event processing. Handlers are
/// registered per concrete event type, which allows compile-time checking of
/// the event types instead of reflection.
#[derive(Default)]
pub struct EventsManager {
    per_type: HashMap<TypeId, Vec<Rc<OnEventFn>>>,
    catch_all: Vec<Box<OnEventFn>>,
    finish: Vec<Box<dyn Fn() + 'static>>,
}

impl Debug for EventsManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EventsManager {{ per_type: {:?}, catch_all: {:?}, finish: {:?} }}",
            self.per_type.len(),
            self.catch_all.len(),
            self.finish.len()
        )
    }
}

impl EventsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_event(&mut self, event: &dyn EventTrait) {
        let tid = event.as_any().type_id();
        if let Some(list) = self.per_type.get(&tid).cloned() {
            for handler in list {
                handler(event);
            }
        }
        for handler in &self.catch_all {
            handler(event);
        }
    }

    pub fn finish(&mut self) {
        for f in self.finish.iter_mut() {
            f()
        }
    }

    /// Registers a callback for a specific event type.
    pub fn on<E, F>(&mut self, f: F)
    where
        E: EventTrait,
        F: Fn(&E) + 'static,
    {
        let type_id = TypeId::of::<E>();
        let entry = self.per_type.entry(type_id).or_default();
        entry.push(Rc::new(move |ev: &dyn EventTrait| {
            if let Some(e) = ev.as_any().downcast_ref::<E>() {
                f(e);
            }
        }));
    }

    /// Registers a callback for all event types.
    pub fn on_any<F>(&mut self, f: F)
    where
        F: Fn(&dyn EventTrait) + 'static,
    {
        self.catch_all.push(Box::new(f));
    }

    pub fn on_finish<F>(&mut self, f: F)
    where
        F: Fn() + 'static,
    {
        self.finish.push(Box::new(f));
    }
}

macro_rules! impl_event_trait {
    ($event:ident, $name:literal) => {
        impl EventTrait for $event {
            fn type_(&self) -> &'static str {
                $name
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn time(&self) -> u32 {
                self.time
            }
        }
    };
}

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct LinkEnterEvent {
    pub vehicle: Id<SimVehicle>,
    pub link: Id<Link>,
    pub time: u32,
}
impl_event_trait!(LinkEnterEvent, "link enter");

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct StopHoldEnteredEvent {
    pub vehicle: Id<SimVehicle>,
    pub link: Id<Link>,
    pub time: u32,
    pub exit_time: u32,
}
impl_event_trait!(StopHoldEnteredEvent, "stop hold entered");

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct StopHoldReleasedEvent {
    pub vehicle: Id<SimVehicle>,
    pub link: Id<Link>,
    pub time: u32,
}
impl_event_trait!(StopHoldReleasedEvent, "stop hold released");

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct ParkingAdmittedEvent {
    pub vehicle: Id<SimVehicle>,
    pub link: Id<Link>,
    pub time: u32,
}
impl_event_trait!(ParkingAdmittedEvent, "parking admitted");

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct ParkingReleasedEvent {
    pub vehicle: Id<SimVehicle>,
    pub link: Id<Link>,
    pub time: u32,
}
impl_event_trait!(ParkingReleasedEvent, "parking released");

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct LaneCapacityChangedEvent {
    pub link: Id<Link>,
    pub time: u32,
    pub change: LaneChange,
}
impl_event_trait!(LaneCapacityChangedEvent, "lane capacity changed");
